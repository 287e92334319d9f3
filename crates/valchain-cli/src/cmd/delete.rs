//! `vchain delete`: remove a chain, its rows, nodes and document.

use super::Context;
use crate::output::render_success;
use anyhow::Result;
use clap::Args;
use valchain_core::db::ChainStore;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Chain id.
    pub chain: i64,
}

/// Execute `vchain delete <chain>`.
///
/// # Errors
///
/// Returns an error if the chain does not exist or the delete fails.
pub fn run_delete(args: &DeleteArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    store.delete_chain(args.chain)?;
    render_success(ctx.output, &format!("deleted chain {}", args.chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn delete_takes_chain_id() {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: DeleteArgs,
        }
        let w = Wrapper::parse_from(["test", "8"]);
        assert_eq!(w.args.chain, 8);
    }
}
