use load_tests::stress::stress_test;
use loadcheck::prelude::*;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    load_tests::init()?;

    let output = stress_test().with_args().await;
    Ok(load_tests::exit_code(&output))
}
