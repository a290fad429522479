use hashicups_provider::{init_logging, serve, HashicupsProvider, ProviderError};

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    init_logging();
    serve(HashicupsProvider::new()).await
}
