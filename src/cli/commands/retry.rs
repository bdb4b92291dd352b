use super::super::{Ctx, RetryArgs, render};
use crate::Result;
use crate::outcome::MigrationResult;

pub(crate) fn handle(ctx: &Ctx, args: RetryArgs) -> Result<()> {
    let bytes = std::fs::read(&args.result)?;
    let previous: MigrationResult = serde_json::from_slice(&bytes)?;
    tracing::info!(
        "retry: re-planning {} failed documents",
        previous.failures.len()
    );

    let plan = ctx.migrator.retry_failed(&previous)?;
    plan.save(&args.out)?;
    render::plan_summary(ctx, &plan, &args.out)
}
