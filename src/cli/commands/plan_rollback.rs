use super::super::{Ctx, PlanRollbackArgs, render};
use super::discover_documents;
use crate::Result;
use crate::core::SchemaVersion;

pub(crate) fn handle(ctx: &Ctx, args: PlanRollbackArgs) -> Result<()> {
    let target = SchemaVersion::parse(&args.target_version)
        .map_err(crate::core::CoreError::InvalidVersion)?;
    let documents = discover_documents(&args.manifest)?;
    tracing::info!(
        "plan-rollback: {} documents discovered, target {target}",
        documents.len()
    );

    let plan = ctx.migrator.plan_rollback(&documents, &target)?;
    plan.save(&args.out)?;
    render::plan_summary(ctx, &plan, &args.out)
}
