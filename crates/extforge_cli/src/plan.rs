//! `extforge plan`: what a build would do, without running any toolchain.

use extforge_core::{BuildPlan, BuildStrategy, SourceType, Staleness};

use crate::pipeline::{load_project, resolve};
use crate::{GlobalArgs, PlanArgs, ReportFormat};

/// Runs the `extforge plan` command. Always returns exit code 0 on success.
pub fn run(args: &PlanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let resolved = resolve(&project, &args.target)?;
    let strategy = BuildStrategy::new(&resolved.toolchain, resolved.options);
    let plan = strategy.plan(&resolved.target)?;

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&plan)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&plan))?),
    }
    Ok(0)
}

fn verdict(staleness: &Staleness) -> String {
    match staleness {
        Staleness::Fresh => "up to date".to_string(),
        Staleness::Stale(reason) => format!("stale: {reason}"),
    }
}

fn render_text(plan: &BuildPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("artifact  {}\n", plan.artifact.display()));
    out.push_str(&format!("status    {}\n", verdict(&plan.staleness)));
    out.push_str(&format!("link      {}\n", plan.language));
    for kind in [
        SourceType::C,
        SourceType::Cpp,
        SourceType::ObjC,
        SourceType::Asm,
        SourceType::Other,
    ] {
        let bucket = plan.buckets.get(kind);
        if !bucket.is_empty() {
            out.push_str(&format!("{:<9} {} sources\n", kind.label(), bucket.len()));
        }
    }
    for object in &plan.objects {
        out.push_str(&format!(
            "  {} -> {}\n",
            object.source.path().display(),
            object.path.display()
        ));
    }
    out
}

fn to_json(plan: &BuildPlan) -> serde_json::Value {
    serde_json::json!({
        "artifact": plan.artifact,
        "stale": plan.staleness.is_stale(),
        "status": verdict(&plan.staleness),
        "language": plan.language,
        "buckets": plan.buckets,
        "objects": plan.objects,
    })
}
