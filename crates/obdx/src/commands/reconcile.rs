//! `obdx reconcile`: one pass, or the periodic task with `--watch`.

use tabled::Tabled;

use obdx_core::{Finding, ReconcileReport, RemoteStore, Scheduler};

use crate::cli::{GlobalOpts, OutputFormat, ReconcileArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Slot")]
    slot: String,
    #[tabled(rename = "Repaired")]
    repaired: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn rows(report: &ReconcileReport) -> Vec<FindingRow> {
    report
        .findings
        .iter()
        .map(|f| FindingRow {
            kind: f.kind(),
            slot: f.slot_id().to_string(),
            repaired: if report.repaired.contains(f) { "yes" } else { "no" },
            detail: f.to_string(),
        })
        .collect()
}

fn summary(report: &ReconcileReport) -> String {
    format!(
        "{} finding(s), {} repaired, {} deferred, {} error(s)",
        report.findings.len(),
        report.repaired.len(),
        report.deferred,
        report.errors.len()
    )
}

fn render(report: &ReconcileReport, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match global.output {
        // Tables are per finding; structured formats keep the whole report.
        OutputFormat::Table if report.is_clean() => String::new(),
        OutputFormat::Table => output::table(&rows(report)),
        OutputFormat::Plain => report
            .findings
            .iter()
            .map(Finding::kind)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => output::render_single(&global.output, report, summary, summary)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    scheduler: &Scheduler<RemoteStore>,
    args: ReconcileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = scheduler.reconcile(args.repair).await?;
    render(&report, global)?;
    for err in &report.errors {
        output::caution(global, err);
    }
    if report.deferred > 0 {
        output::caution(
            global,
            &format!(
                "{} slot(s) changed less than {}s ago; run again later to repair them",
                report.deferred,
                scheduler.config().reconcile_grace.as_secs()
            ),
        );
    }
    output::notice(global, &summary(&report));

    if !args.watch {
        return Ok(());
    }

    if !scheduler.start_reconciler().await {
        return Err(CliError::validation(
            "scheduler.reconcile_interval_secs",
            "is 0; set an interval to use --watch",
        ));
    }
    output::notice(
        global,
        &format!(
            "Reconciling every {}s, Ctrl-C to stop",
            scheduler.config().reconcile_interval.as_secs()
        ),
    );
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await;
    Ok(())
}
