use load_tests::smoke::smoke_test;
use loadcheck::prelude::*;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    load_tests::init()?;

    let output = smoke_test().with_args().await;
    Ok(load_tests::exit_code(&output))
}
