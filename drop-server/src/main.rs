use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = drop_server::load_config();
    let ax = drop_server::build(&config)?;

    ax.listen(drop_server::listen_addr(&config)).await?;

    Ok(())
}
