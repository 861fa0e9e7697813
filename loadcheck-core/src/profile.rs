use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// One step of a ramping profile: move to `target` virtual users over `duration`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub const fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} VUs",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

/// How many virtual users run at any point of a scenario.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadProfile {
    Constant {
        vus: usize,
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        duration: Duration,
    },
    Ramping {
        start_vus: usize,
        stages: Vec<Stage>,
    },
}

impl LoadProfile {
    pub fn total_duration(&self) -> Duration {
        match self {
            LoadProfile::Constant { duration, .. } => *duration,
            LoadProfile::Ramping { stages, .. } => stages.iter().map(|s| s.duration).sum(),
        }
    }

    /// Target number of virtual users `elapsed` into the run.
    ///
    /// Within a stage the target moves linearly from the previous stage's target (or the
    /// starting VUs) to the stage's own target, rounded to the nearest whole VU.
    pub fn target_vus(&self, elapsed: Duration) -> usize {
        match self {
            LoadProfile::Constant { vus, .. } => *vus,
            LoadProfile::Ramping { start_vus, stages } => {
                let mut from = *start_vus;
                let mut stage_start = Duration::ZERO;

                for stage in stages {
                    let stage_end = stage_start + stage.duration;
                    if elapsed < stage_end {
                        let progress = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        let delta = stage.target as f64 - from as f64;
                        return (from as f64 + delta * progress).round().max(0.) as usize;
                    }
                    from = stage.target;
                    stage_start = stage_end;
                }

                from
            }
        }
    }

    /// Largest number of virtual users the profile ever asks for.
    pub fn max_vus(&self) -> usize {
        match self {
            LoadProfile::Constant { vus, .. } => *vus,
            LoadProfile::Ramping { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, usize::max),
        }
    }
}

impl fmt::Display for LoadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadProfile::Constant { vus, duration } => write!(
                f,
                "{vus} VUs for {}",
                humantime::format_duration(*duration)
            ),
            LoadProfile::Ramping { start_vus, stages } => {
                write!(f, "ramping from {start_vus} VUs")?;
                for stage in stages {
                    write!(f, ", {stage}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mins(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    fn stress_profile() -> LoadProfile {
        LoadProfile::Ramping {
            start_vus: 0,
            stages: vec![
                Stage::new(mins(2), 10),
                Stage::new(mins(5), 10),
                Stage::new(mins(2), 50),
                Stage::new(mins(5), 50),
                Stage::new(mins(2), 100),
                Stage::new(mins(5), 100),
                Stage::new(mins(2), 0),
            ],
        }
    }

    #[test]
    fn test_constant() {
        let profile = LoadProfile::Constant {
            vus: 5,
            duration: mins(1),
        };
        assert_eq!(profile.target_vus(Duration::ZERO), 5);
        assert_eq!(profile.target_vus(Duration::from_secs(59)), 5);
        assert_eq!(profile.total_duration(), mins(1));
        assert_eq!(profile.max_vus(), 5);
    }

    #[test]
    fn test_ramping_total_duration() {
        assert_eq!(stress_profile().total_duration(), mins(23));
        assert_eq!(stress_profile().max_vus(), 100);
    }

    #[test]
    fn test_ramping_targets() {
        let profile = stress_profile();
        assert_eq!(profile.target_vus(Duration::ZERO), 0);
        assert_eq!(profile.target_vus(mins(1)), 5);
        assert_eq!(profile.target_vus(mins(2)), 10);
        assert_eq!(profile.target_vus(mins(5)), 10);
        assert_eq!(profile.target_vus(mins(8)), 30);
        assert_eq!(profile.target_vus(mins(10)), 50);
        assert_eq!(profile.target_vus(mins(15)), 75);
        assert_eq!(profile.target_vus(mins(18)), 100);
        assert_eq!(profile.target_vus(mins(22)), 50);
        assert_eq!(profile.target_vus(mins(23)), 0);
        assert_eq!(profile.target_vus(mins(30)), 0);
    }

    #[test]
    fn test_zero_duration_stage_jumps() {
        let profile = LoadProfile::Ramping {
            start_vus: 2,
            stages: vec![
                Stage::new(Duration::ZERO, 8),
                Stage::new(Duration::from_secs(10), 8),
            ],
        };
        assert_eq!(profile.target_vus(Duration::ZERO), 8);
        assert_eq!(profile.target_vus(Duration::from_secs(5)), 8);
    }

    #[test]
    fn test_display() {
        let profile = LoadProfile::Ramping {
            start_vus: 0,
            stages: vec![Stage::new(mins(2), 10)],
        };
        assert_eq!(profile.to_string(), "ramping from 0 VUs, 2m -> 10 VUs");
    }
}
