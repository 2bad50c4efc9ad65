pub mod download;
pub mod search;
pub mod submit;

use crate::cli::Commands;
use crate::context::ClientContext;

/// Run one parsed command
pub async fn dispatch(command: Commands, ctx: &ClientContext) -> anyhow::Result<()> {
    match command {
        Commands::Submit(args) => submit::handle_submit(&args, ctx).await,
        Commands::Retry(args) => submit::handle_retry(&args, ctx).await,
        Commands::Pending => submit::handle_pending(ctx).await,
        Commands::Search(args) => search::handle(&args, ctx).await,
        Commands::Download(args) => download::handle(&args, ctx).await,
    }
}
