use fluentcloud_mock::MockSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let settings = MockSettings::from_env();
    fluentcloud_mock::serve(settings).await
}
