use super::super::{Ctx, GcArgs, render};
use super::discover_documents;
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, args: GcArgs) -> Result<()> {
    let documents = discover_documents(&args.manifest)?;
    let summary = ctx.migrator.gc(&documents)?;
    render::gc_summary(ctx, &summary)
}
