use super::super::{Ctx, ResumeArgs, render};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx, args: ResumeArgs) -> Result<()> {
    let result = ctx.migrator.resume(&args.transactions)?;
    render::write_json(&args.out, &result)?;
    render::result_summary(ctx, &result, &args.out)
}
