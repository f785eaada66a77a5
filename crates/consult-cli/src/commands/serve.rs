use std::sync::Arc;

use crate::cli::root_commands::ServeArgs;
use crate::context::AppContext;
use crate::server;

/// Handle `consult serve`.
pub async fn handle(args: &ServeArgs, ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let mut server_config = ctx.config.server.clone();
    if let Some(bind) = &args.bind {
        server_config.bind.clone_from(bind);
    }
    server::serve(ctx, &server_config).await
}
