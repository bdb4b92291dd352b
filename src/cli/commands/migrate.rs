use super::super::{Ctx, MigrateArgs, render};
use crate::Result;
use crate::migrator;
use crate::plan::Plan;

pub(crate) fn handle(ctx: &Ctx, args: MigrateArgs) -> Result<()> {
    let plan = Plan::load(&args.plan)?;
    let transactions = args
        .transactions
        .clone()
        .or_else(|| ctx.transactions_dir.clone());

    let result = ctx.migrator.execute(&plan, transactions.as_deref())?;
    render::write_json(&args.out, &result)?;
    render::result_summary(ctx, &result, &args.out)?;

    match migrator::batch_error(&result) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
