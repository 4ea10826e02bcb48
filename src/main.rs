// sketchsim: microcontroller sketch simulator with pin and serial visualization

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use sketchsim::interpreter::{Engine, EngineConfig};
use sketchsim::parser::extract;
use sketchsim::ui::{App, LoadedCircuit};

struct Options {
    sketch: PathBuf,
    speed: f64,
    circuit: Option<PathBuf>,
}

fn usage(program_name: &str) {
    eprintln!();
    eprintln!(
        "Usage: {} <sketch.ino> [--speed <x>] [--circuit <file.json>]",
        program_name
    );
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} blink.ino                      # Run a sketch", program_name);
    eprintln!(
        "  {} blink.ino --speed 4            # Run four times faster",
        program_name
    );
    eprintln!(
        "  {} blink.ino --circuit diagram.json  # Wire parts to the board",
        program_name
    );
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut sketch = None;
    let mut speed = 1.0;
    let mut circuit = None;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--speed" => {
                let value = rest.next().ok_or("--speed needs a value")?;
                speed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| format!("Invalid speed '{}'", value))?;
            }
            "--circuit" => {
                let value = rest.next().ok_or("--circuit needs a file")?;
                circuit = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option '{}'", flag)),
            path if sketch.is_none() => sketch = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument '{}'", extra)),
        }
    }

    let sketch = sketch.ok_or("No sketch file provided")?;
    Ok(Options {
        sketch,
        speed,
        circuit,
    })
}

fn load_circuit(engine: &mut Engine, path: &Path) -> Option<LoadedCircuit> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Warning: Cannot read circuit '{}': {}", path.display(), e);
            return None;
        }
    };
    let Some(circuit) = engine.import_circuit(&json) else {
        eprintln!(
            "Warning: Circuit '{}' is not valid JSON, continuing without it",
            path.display()
        );
        return None;
    };
    let attached = engine.attach_circuit(&circuit);
    eprintln!(
        "Loaded circuit {} with {} parts, {} wired to the board.",
        path.display(),
        circuit.parts.len(),
        attached
    );
    Some(LoadedCircuit {
        circuit,
        path: path.to_path_buf(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("sketchsim");

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            usage(program_name);
            std::process::exit(1);
        }
    };

    let source = match fs::read_to_string(&options.sketch) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", options.sketch.display(), e);
            usage(program_name);
            std::process::exit(1);
        }
    };

    eprintln!("Loading {}...", options.sketch.display());
    let sketch = extract(&source);
    eprintln!(
        "Parsed successfully. Found {} functions and {} globals.",
        sketch.functions.len(),
        sketch.globals.len()
    );

    let mut engine = Engine::with_config(EngineConfig {
        speed: options.speed,
        ..EngineConfig::default()
    });
    let circuit = options
        .circuit
        .as_deref()
        .and_then(|path| load_circuit(&mut engine, path));
    if !engine.peripherals().is_empty() {
        eprintln!("Registered {} peripherals.", engine.peripherals().len());
    }
    engine.start(&source)?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine, source, circuit);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }
    for line in app.engine.serial().get_output() {
        println!("{}", line);
    }
    eprintln!(
        "Final status: {} after {} serial events.",
        app.engine.status(),
        app.engine.serial().len()
    );

    Ok(())
}
