#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = judge_integrator::run_mock_judge().await {
        eprintln!("mock judge fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
