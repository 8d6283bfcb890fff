use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Import from redline-core
use redline_core::config::ProcessRequirement;
use redline_core::{ReviewConfig, ReviewProcessor, ReviewStatus, Severity};

// Import CLI utilities
use redline::{load_config, run, RunOptions, RunSummary};

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Review documents against a compliance rule table and write annotated copies")]
struct Args {
    /// Document to review (.docx, .txt or .md); repeat for a batch
    #[arg(short, long = "input", required_unless_present = "show_config")]
    inputs: Vec<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory receiving the Reviewed_<name> copies
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write a JSON report of the batch to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    show_config: bool,

    /// Log per-stage timings for every document
    #[arg(long)]
    profile: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    println!("🦀 Redline Document Review");

    // Configuration defects abort the run before any document is read
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    if args.show_config {
        show_config(&config)?;
        return Ok(());
    }

    let processor = match ReviewProcessor::new(config) {
        Ok(processor) => processor.with_profiling(args.profile),
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let summary = run(
        &processor,
        &RunOptions {
            inputs: args.inputs,
            output_dir: args.output_dir,
            report: args.report.clone(),
        },
    )?;

    print_summary(&summary, &processor.config().requirements);
    if let Some(report) = &args.report {
        println!("💾 Report saved to: {}", report.display());
    }
    Ok(())
}

/// Logs go to stderr so stdout stays the human-readable summary
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("redline=info,redline_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn show_config(config: &ReviewConfig) -> Result<()> {
    println!("{}", config.to_yaml()?);

    println!("📁 Example config files in ./configs/:");
    println!("  adgm.yaml           - Built-in ADGM company-formation tables");
    println!("  adgm-extended.yaml  - More document types, merged comments");

    println!("\n📝 Usage Examples:");
    println!("  redline -i AoA.docx");
    println!("  redline -i AoA.docx -i UBO.docx -o reviewed/ --report report.json");
    println!("  redline -i AoA.docx -c configs/adgm-extended.yaml --profile");
    Ok(())
}

fn print_summary(summary: &RunSummary, requirements: &[ProcessRequirement]) {
    let batch = &summary.batch;

    println!("\n📊 Document Review Results");
    println!("   - Total Issues: {}", batch.total_issues());
    let counts = batch.severity_counts();
    for severity in Severity::ALL.iter().rev() {
        println!("   - {} Severity: {}", severity, counts.get(*severity));
    }

    for unreadable in &summary.unreadable {
        println!(
            "⚠️  Could not read {}: {}",
            unreadable.path.display(),
            unreadable.error
        );
    }

    // Batch issues are grouped by document in batch order
    let mut remaining = batch.issues.iter();
    for document in &batch.documents {
        if let ReviewStatus::Failed { reason } = &document.status {
            println!("\n❌ {}: {}", document.name, reason);
            continue;
        }

        println!(
            "\n📄 {} ({}) - {} issues",
            document.name, document.document_type, document.issues
        );
        if document.issues == 0 {
            println!("   ✅ No issues found.");
        }
        for issue in remaining.by_ref().take(document.issues) {
            println!(
                "   🔴 {} - {} ({:?})",
                issue.severity, issue.issue, issue.matched_text
            );
        }
        if document.annotated < document.issues {
            println!(
                "   ⚠️  {} issue(s) could not be annotated inline",
                document.issues - document.annotated
            );
        }
    }

    for entry in batch.checklist(requirements) {
        if entry.is_complete() {
            println!("\n📋 {}: all required documents reviewed", entry.process);
        } else {
            println!(
                "\n📋 {}: {} of {} required documents reviewed",
                entry.process,
                entry.uploaded.len(),
                entry.required.len()
            );
            for missing in &entry.missing {
                println!("   - missing: {}", missing);
            }
        }
    }

    if !summary.written.is_empty() {
        println!();
    }
    for path in &summary.written {
        println!("💾 Reviewed document saved to: {}", path.display());
    }
}
