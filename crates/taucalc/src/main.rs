//! taucalc - arithmetic through boolean circuits on the Tau engine
//!
//! Calculations are synthesized into engine programs, executed bit by bit and
//! decoded. `emit` prints the program without running it; `run` and `exec`
//! talk to the engine directly.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taucalc::{CalculationResult, Calculator, CalculatorSettings, DecimalMode, Operation};
use taucalc_circuit::{decode, EngineProgram, FloatFormat, NumberMode};
use taucalc_engine::{CommandChannel, EngineConfig, EngineEvent, ProcessSupervisor};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "taucalc")]
#[command(about = "Arithmetic computed by boolean circuits on the Tau engine")]
struct Cli {
    /// Path to the engine binary (default: PATH, then tau-binary/)
    #[arg(long, env = "TAU_ENGINE", global = true)]
    engine: Option<PathBuf>,

    /// JSON file with engine settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-command timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Forward engine output lines to stderr
    #[arg(long, global = true)]
    echo: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate `a <op> b` on the engine
    Calc(CalcArgs),
    /// Print the program for `a <op> b` without running it
    Emit(CalcArgs),
    /// Execute a program file and print its display results
    Run {
        /// Program file in the engine's formula language
        file: PathBuf,

        /// Decode the bit outputs as a number
        #[arg(long, value_enum)]
        decode: Option<Mode>,

        #[command(flatten)]
        format: FormatArgs,

        #[arg(long)]
        json: bool,
    },
    /// Send one command and print the raw response
    Exec {
        /// Command text, e.g. `n 1 & 0`
        command: String,
    },
    /// Print the effective engine configuration as JSON
    Config,
}

#[derive(Args, Debug)]
struct CalcArgs {
    #[arg(allow_negative_numbers = true)]
    a: f64,

    /// One of + - * × x / ÷
    op: Operation,

    #[arg(allow_negative_numbers = true)]
    b: f64,

    #[arg(long, value_enum, default_value = "integer")]
    mode: Mode,

    #[command(flatten)]
    format: FormatArgs,

    /// Keep the engine running after the calculation
    #[arg(long)]
    no_respawn: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// Operand bit width
    #[arg(long, default_value = "8")]
    width: u32,

    /// Decimal places in fixed-point mode
    #[arg(long, default_value = "2")]
    places: u32,

    /// Exponent bits in floating-point mode (mantissa gets the rest)
    #[arg(long)]
    exponent_bits: Option<u32>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Integer,
    Fixed,
    Float,
}

impl FormatArgs {
    fn float_format(&self) -> anyhow::Result<Option<FloatFormat>> {
        self.exponent_bits
            .map(|exponent| {
                let mantissa = self.width.saturating_sub(1 + exponent);
                FloatFormat::new(exponent, mantissa, self.width)
            })
            .transpose()
            .context("Invalid floating-point format")
    }

    fn settings(&self, mode: Mode) -> anyhow::Result<CalculatorSettings> {
        Ok(CalculatorSettings {
            bit_width: self.width,
            decimal_mode: if mode == Mode::Float {
                DecimalMode::FloatingPoint
            } else {
                DecimalMode::FixedPoint
            },
            decimal_places: self.places,
            float_format: self.float_format()?,
            respawn_after_calculation: true,
        })
    }

    fn number_mode(&self, mode: Mode) -> anyhow::Result<NumberMode> {
        let settings = self.settings(mode)?;
        Ok(match mode {
            Mode::Integer => NumberMode::Integer,
            Mode::Fixed | Mode::Float => settings.decimal_number_mode(),
        })
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "taucalc=debug,taucalc_engine=debug,taucalc_circuit=debug"
    } else {
        "taucalc=info,taucalc_engine=info,taucalc_circuit=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn engine_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid engine configuration in {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(engine) = &cli.engine {
        config.binary_path = Some(engine.clone());
    }
    if let Some(ms) = cli.timeout_ms {
        config.command_timeout = Duration::from_millis(ms);
    }
    Ok(config)
}

fn as_integer(value: f64) -> anyhow::Result<i64> {
    if value.fract() != 0.0 || !value.is_finite() {
        bail!("{value} is not an integer; use --mode fixed or --mode float");
    }
    Ok(value as i64)
}

fn program_for(calculator: &Calculator, args: &CalcArgs) -> anyhow::Result<EngineProgram> {
    let program = match args.mode {
        Mode::Integer => {
            calculator.integer_program(as_integer(args.a)?, as_integer(args.b)?, args.op)?
        }
        Mode::Fixed | Mode::Float => calculator.decimal_program(args.a, args.b, args.op)?,
    };
    Ok(program)
}

fn print_result(args: &CalcArgs, result: &CalculationResult) {
    if args.json {
        let report = json!({
            "a": args.a,
            "operation": args.op.to_string(),
            "b": args.b,
            "value": result.value,
            "execution_ms": result.execution_time.as_secs_f64() * 1000.0,
            "defaulted_bits": result.defaulted_bits,
        });
        println!("{report}");
    } else {
        println!("{} {} {} = {}", args.a, args.op, args.b, result.value);
        if !result.defaulted_bits.is_empty() {
            println!("(bits {:?} were missing and read as 0)", result.defaulted_bits);
        }
    }
}

/// Forwards engine output to stderr until the supervisor goes away.
fn spawn_echo(supervisor: &ProcessSupervisor) {
    let mut events = supervisor.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::Line(line)) => eprintln!("{line}"),
                Ok(EngineEvent::Stderr(line)) => eprintln!("[stderr] {line}"),
                Ok(EngineEvent::Exited) => eprintln!("[engine exited]"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = engine_config(&cli)?;
    if matches!(cli.command, Command::Config) {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let supervisor = Arc::new(ProcessSupervisor::with_real_spawner(config));
    if cli.echo {
        spawn_echo(&supervisor);
    }

    match &cli.command {
        Command::Calc(args) | Command::Emit(args) => {
            let mut settings = args.format.settings(args.mode)?;
            settings.respawn_after_calculation = !args.no_respawn;
            let mut calculator = Calculator::new(Arc::clone(&supervisor), settings)?;

            if matches!(cli.command, Command::Emit(_)) {
                print!("{}", program_for(&calculator, args)?);
                return Ok(());
            }

            let result = match args.mode {
                Mode::Integer => {
                    let (a, b) = (as_integer(args.a)?, as_integer(args.b)?);
                    calculator.calculate(a, b, args.op).await?
                }
                Mode::Fixed | Mode::Float => {
                    calculator.calculate_decimal(args.a, args.b, args.op).await?
                }
            };
            print_result(args, &result);
        }
        Command::Run {
            file,
            decode: decode_mode,
            format,
            json,
        } => {
            let program = EngineProgram::load(file)?;
            let mut channel = CommandChannel::new(Arc::clone(&supervisor));
            let run = channel.run_program(&program).await?;
            info!("Executed {} in {:?}", file.display(), run.elapsed);

            let decoded = match decode_mode {
                Some(mode) => Some(decode(&run.outputs, format.width, format.number_mode(*mode)?)?),
                None => None,
            };

            if *json {
                let report = json!({
                    "outputs": run.outputs,
                    "execution_ms": run.elapsed.as_secs_f64() * 1000.0,
                    "value": decoded.as_ref().map(|d| d.value),
                });
                println!("{report}");
            } else {
                for output in &run.outputs {
                    println!("{}: {}", output.name, output.content);
                }
                if let Some(decoded) = decoded {
                    println!("value: {}", decoded.value);
                }
            }
        }
        Command::Exec { command } => {
            let mut channel = CommandChannel::new(Arc::clone(&supervisor));
            let output = channel.execute(command).await?;
            println!("{output}");
        }
        Command::Config => {}
    }

    supervisor.stop().await;
    Ok(())
}
