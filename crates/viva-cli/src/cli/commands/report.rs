use super::{exit_codes, print_json, Context};
use crate::cli::args::ReportArgs;
use viva_core::report::{build_report, console::render_report};

pub fn cmd_report(ctx: &Context, args: ReportArgs) -> anyhow::Result<i32> {
    let report = build_report(ctx.store.as_ref(), &args.session_id)?;
    if args.format == "json" {
        print_json(&report)?;
    } else {
        print!("{}", render_report(&report));
    }
    Ok(exit_codes::OK)
}
