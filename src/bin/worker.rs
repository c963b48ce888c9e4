#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = judge_integrator::run_worker().await {
        eprintln!("judge-integrator worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
