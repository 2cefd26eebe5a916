use coinmatrix_cache::app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = App::from_args();

    #[cfg(feature = "tracing")]
    app.setup_tracing()?;

    app.run().await
}
