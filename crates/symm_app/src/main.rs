use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};
use pollster::block_on;
use symm_core::{
    case_io::{default_cases, export_cases_to_json, import_cases_from_json},
    run_instance, Complex32, Complex64, CpuReference, DeviceContext, ElementKind, HarnessSettings,
    ProblemDescriptor, Report, Verdict,
};
use symm_gpu::GpuOptions;
use tracer::init_tracing;
use tracing::info;

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config: Option<PathBuf>,
    input_json: Option<PathBuf>,
    export_json: Option<PathBuf>,
    skip_dispatch: bool,
    seed: Option<u64>,
    iterations: Option<u32>,
    kinds: Option<Vec<ElementKind>>,
    row_major_reference: bool,
    no_reference: bool,
    global_memory_bytes: Option<u64>,
    fallback_adapter: bool,
}

impl CliOptions {
    /// Command-line flags win over the settings file.
    fn apply(&self, settings: &mut HarnessSettings) {
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            settings.iterations = iterations;
        }
        if let Some(kinds) = &self.kinds {
            settings.kinds = kinds.clone();
        }
        if self.row_major_reference {
            settings.row_major_reference = true;
        }
        if self.no_reference {
            settings.reference_enabled = false;
        }
        if self.global_memory_bytes.is_some() {
            settings.global_memory_bytes = self.global_memory_bytes;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let options = parse_options(env::args().skip(1))?;

    let mut settings = match &options.config {
        Some(path) => HarnessSettings::load_json(path)?,
        None => HarnessSettings::default(),
    };
    options.apply(&mut settings);

    let case_sets = if let Some(ref path) = options.input_json {
        info!("loading SYMM case sets from {}", path.display());
        import_cases_from_json(path)?
    } else {
        default_cases()
    };

    if let Some(ref path) = options.export_json {
        export_cases_to_json(&case_sets, path)?;
        info!(
            "exported {} case sets ({}) to {}",
            case_sets.len(),
            case_sets
                .iter()
                .map(|set| set.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            path.display()
        );
    }

    if options.skip_dispatch {
        info!("skip-dispatch flag set; exiting after case preparation");
        return Ok(());
    }

    let gpu = block_on(symm_gpu::init(&GpuOptions {
        global_memory_bytes: settings.global_memory_bytes,
        force_fallback_adapter: options.fallback_adapter,
        low_power: false,
    }))?;
    info!(
        adapter = gpu.adapter_name(),
        seed = format_args!("0x{:X}", settings.seed),
        iterations = settings.iterations,
        "starting SYMM performance run"
    );

    let mut report = Report::default();
    for &kind in &settings.kinds {
        for set in &case_sets {
            info!(
                routine = kind.routine(),
                "running set '{}' ({} cases)",
                set.label,
                set.cases.len()
            );
            for problem in &set.cases {
                let verdict = run_case(&gpu, kind, problem, &settings);
                report.record(kind, problem, &verdict);
            }
        }
    }

    info!("{report}");
    if report.has_failures() {
        bail!(
            "{} case(s) were slower than the reference and {} failed fatally",
            report.regressed,
            report.fatal
        );
    }
    Ok(())
}

fn run_case<D: DeviceContext>(
    ctx: &D,
    kind: ElementKind,
    problem: &ProblemDescriptor,
    settings: &HarnessSettings,
) -> Verdict {
    match kind {
        ElementKind::Single => run_instance::<f32, D>(ctx, Some(&CpuReference), problem, settings),
        ElementKind::Double => run_instance::<f64, D>(ctx, Some(&CpuReference), problem, settings),
        ElementKind::SingleComplex => {
            run_instance::<Complex32, D>(ctx, Some(&CpuReference), problem, settings)
        }
        ElementKind::DoubleComplex => {
            run_instance::<Complex64, D>(ctx, Some(&CpuReference), problem, settings)
        }
    }
}

fn parse_options<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = CliOptions::default();

    for arg in args {
        if let Some(value) = arg.strip_prefix("--config=") {
            opts.config = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--cases-json=") {
            opts.input_json = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--export-json=") {
            opts.export_json = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--types=") {
            opts.kinds = Some(parse_kinds(value)?);
        } else if let Some(value) = arg.strip_prefix("--seed=") {
            opts.seed = Some(parse_seed(value).context("invalid --seed value")?);
        } else if let Some(value) = arg.strip_prefix("--iterations=") {
            opts.iterations = Some(value.parse().context("invalid --iterations value")?);
        } else if let Some(value) = arg.strip_prefix("--global-mem=") {
            opts.global_memory_bytes = Some(value.parse().context("invalid --global-mem value")?);
        } else if arg == "--row-major-reference" {
            opts.row_major_reference = true;
        } else if arg == "--no-reference" {
            opts.no_reference = true;
        } else if arg == "--fallback-adapter" {
            opts.fallback_adapter = true;
        } else if arg == "--skip-dispatch" {
            opts.skip_dispatch = true;
        } else {
            bail!("unrecognized argument: {arg}");
        }
    }

    Ok(opts)
}

fn parse_kinds(value: &str) -> Result<Vec<ElementKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<ElementKind>().context("invalid --types value"))
        .collect()
}

fn parse_seed(value: &str) -> Result<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).context("expected hex literal")
    } else {
        value.parse().context("expected integer seed")
    }
}

mod tracer {
    use tracing_subscriber::EnvFilter;

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
