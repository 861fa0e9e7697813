//! Request bodies sent to the service.
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub a: i64,
    pub b: i64,
    pub operation: Operation,
}

impl CalculateRequest {
    /// An `add` of two integers in `[0, 100)`.
    pub fn random_add<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            a: rng.gen_range(0..100),
            b: rng.gen_range(0..100),
            operation: Operation::Add,
        }
    }

    /// Any operation over two integers in `[1, 100]`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let operation = Operation::ALL
            .choose(rng)
            .copied()
            .unwrap_or(Operation::Add);
        let a = rng.gen_range(1..=100);
        let b = rng.gen_range(1..=100);

        Self {
            a,
            b: guard_divisor(operation, b),
            operation,
        }
    }
}

/// A zero divisor becomes `1`. Operands drawn from `[1, 100]` never hit this.
pub fn guard_divisor(operation: Operation, b: i64) -> i64 {
    if operation == Operation::Divide && b == 0 {
        1
    } else {
        b
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: String,
}

impl NewItem {
    pub fn at(now: SystemTime) -> Self {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Self {
            name: format!("Item {millis}"),
            description: format!(
                "Stress test item created at {}",
                humantime::format_rfc3339_millis(now)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::time::Duration;

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let req = CalculateRequest::random(&mut rng);
            assert!(Operation::ALL.contains(&req.operation));
            assert!((1..=100).contains(&req.a));
            assert!((1..=100).contains(&req.b));
            if req.operation == Operation::Divide {
                assert_ne!(req.b, 0);
            }
        }
    }

    #[test]
    fn test_random_add() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let req = CalculateRequest::random_add(&mut rng);
            assert_eq!(req.operation, Operation::Add);
            assert!((0..100).contains(&req.a));
            assert!((0..100).contains(&req.b));
        }
    }

    #[test]
    fn test_guard_divisor() {
        assert_eq!(guard_divisor(Operation::Divide, 0), 1);
        assert_eq!(guard_divisor(Operation::Divide, 7), 7);
        assert_eq!(guard_divisor(Operation::Subtract, 0), 0);
    }

    #[test]
    fn test_payload_shapes() {
        let req = CalculateRequest {
            a: 3,
            b: 4,
            operation: Operation::Multiply,
        };
        assert_eq!(
            serde_json::to_value(req).unwrap(),
            serde_json::json!({"a": 3, "b": 4, "operation": "multiply"})
        );

        let item = NewItem::at(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
        assert_eq!(item.name, "Item 1700000000123");
        assert_eq!(
            item.description,
            "Stress test item created at 2023-11-14T22:13:20.123Z"
        );
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            serde_json::json!({
                "name": "Item 1700000000123",
                "description": "Stress test item created at 2023-11-14T22:13:20.123Z",
            })
        );
    }
}
