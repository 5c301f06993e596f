use venus_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    if let Err(e) = venus_bridge::run(options).await {
        error!("Application error: {:?}", e);
        return Err(e);
    }

    Ok(())
}
