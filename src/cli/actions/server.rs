use crate::api;
use crate::cli::actions::Action;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, globals } => {
            // Fail fast on an unusable link base before binding anything.
            Url::parse(&globals.base_url)?;

            api::new(port, dsn, &globals).await?;
        }
    }

    Ok(())
}
