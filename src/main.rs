#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = judge_integrator::run().await {
        eprintln!("judge-integrator fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
