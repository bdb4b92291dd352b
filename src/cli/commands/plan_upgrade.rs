use super::super::{Ctx, PlanUpgradeArgs, render};
use super::discover_documents;
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, args: PlanUpgradeArgs) -> Result<()> {
    let documents = discover_documents(&args.manifest)?;
    tracing::info!("plan-upgrade: {} documents discovered", documents.len());

    let plan = ctx.migrator.plan_upgrade(&documents)?;
    plan.save(&args.out)?;
    render::plan_summary(ctx, &plan, &args.out)
}
