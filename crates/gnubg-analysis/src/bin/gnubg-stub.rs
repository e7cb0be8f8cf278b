//! Stand-in for the gnubg console build.
//!
//! Reads an analysis session script on stdin, like the real engine, and
//! writes deterministic gnubg-shaped output to the result file named by the
//! script. Flags select failure behaviour:
//!
//! ```text
//! gnubg-stub [-t] [-q] [--mode ok|silent|hang|crash|corrupt]
//!            [--crash-on XGID] [--silent-on XGID]
//!            [--pid-file PATH] [--delay-ms N]
//! ```

use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use gnubg_analysis::script::{parse_bindings, ScriptedRequest};
use xgid_core::Xgid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ok,
    Silent,
    Hang,
    Crash,
    Corrupt,
}

#[derive(Debug)]
struct Options {
    mode: Mode,
    crash_on: Vec<String>,
    silent_on: Vec<String>,
    pid_file: Option<String>,
    delay_ms: Option<u64>,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        mode: Mode::Ok,
        crash_on: Vec::new(),
        silent_on: Vec::new(),
        pid_file: None,
        delay_ms: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("{} needs a value", arg));
        match arg.as_str() {
            "-t" | "-q" => {}
            "--mode" => {
                options.mode = match value()?.as_str() {
                    "ok" => Mode::Ok,
                    "silent" => Mode::Silent,
                    "hang" => Mode::Hang,
                    "crash" => Mode::Crash,
                    "corrupt" => Mode::Corrupt,
                    other => return Err(format!("unknown mode '{}'", other)),
                }
            }
            "--crash-on" => options.crash_on.push(canonical(&value()?)),
            "--silent-on" => options.silent_on.push(canonical(&value()?)),
            "--pid-file" => options.pid_file = Some(value()?),
            "--delay-ms" => {
                let raw = value()?;
                options.delay_ms = Some(raw.parse().map_err(|_| format!("bad delay '{}'", raw))?);
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(options)
}

fn canonical(xgid: &str) -> String {
    Xgid::parse(xgid)
        .map(|x| x.to_string())
        .unwrap_or_else(|_| xgid.to_string())
}

fn main() -> ExitCode {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("gnubg-stub: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Some(path) = &options.pid_file {
        if let Err(e) = std::fs::write(path, std::process::id().to_string()) {
            eprintln!("gnubg-stub: cannot write pid file: {}", e);
            return ExitCode::from(2);
        }
    }

    let mut script = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut script) {
        eprintln!("gnubg-stub: cannot read script: {}", e);
        return ExitCode::from(2);
    }

    let Some((requests, env_name)) = parse_bindings(&script) else {
        eprintln!("gnubg-stub: script does not define REQUESTS and RESULT_PATH_ENV");
        return ExitCode::from(2);
    };

    println!("GNU Backgammon (stub)");
    for request in &requests {
        println!("Analyzing \"{}\"...", request.xgid);
    }

    let delay = options
        .delay_ms
        .unwrap_or_else(|| requests.iter().map(|r| fnv1a(&r.xgid) % 150).sum());
    std::thread::sleep(Duration::from_millis(delay));

    let mode = if requests.iter().any(|r| options.crash_on.contains(&r.xgid)) {
        Mode::Crash
    } else if requests.iter().any(|r| options.silent_on.contains(&r.xgid)) {
        Mode::Silent
    } else {
        options.mode
    };

    match mode {
        Mode::Ok => write_results(&env_name, &requests),
        Mode::Silent => ExitCode::SUCCESS,
        Mode::Hang => loop {
            std::thread::sleep(Duration::from_secs(3600));
        },
        Mode::Crash => {
            for line in 1..=60 {
                eprintln!("evaluation trace line {}", line);
            }
            eprintln!("Segmentation fault while evaluating position");
            ExitCode::from(3)
        }
        Mode::Corrupt => write_file(&env_name, "{\"xgid\": [not json"),
    }
}

fn write_results(env_name: &str, requests: &[ScriptedRequest]) -> ExitCode {
    let reports: Vec<serde_json::Value> = requests
        .iter()
        .map(|r| {
            serde_json::json!({
                "xgid": r.xgid,
                "hint": hint_text(r),
                "eval": eval_text(r),
            })
        })
        .collect();
    write_file(env_name, &serde_json::Value::Array(reports).to_string())
}

fn write_file(env_name: &str, content: &str) -> ExitCode {
    let Some(path) = std::env::var_os(env_name) else {
        eprintln!("gnubg-stub: {} is not set", env_name);
        return ExitCode::from(4);
    };
    match std::fs::write(&path, content) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gnubg-stub: cannot write result: {}", e);
            ExitCode::from(4)
        }
    }
}

const PLAYS: [&str; 8] = [
    "24/18 13/10",
    "13/10 13/7",
    "8/5 6/5",
    "24/13",
    "13/8 6/5",
    "24/20 13/8",
    "8/2 6/2",
    "24/22 13/9",
];

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// A value in `[-range, range]` derived from `hash` and `salt`.
fn spread(hash: u64, salt: u64, range: f64) -> f64 {
    let bucket = hash.rotate_left((salt * 7) as u32) % 2001;
    (bucket as f64 / 1000.0 - 1.0) * range
}

fn probabilities(hash: u64, salt: u64) -> String {
    let win = 0.5 + spread(hash, salt, 0.2);
    let win_gammon = win * 0.25;
    let lose = 1.0 - win;
    let lose_gammon = lose * 0.25;
    format!(
        "{:.3} {:.3} {:.3} - {:.3} {:.3} {:.3}",
        win,
        win_gammon,
        win_gammon * 0.04,
        lose,
        lose_gammon,
        lose_gammon * 0.04
    )
}

fn evaluator(request: &ScriptedRequest) -> String {
    let kind = if request.cubeful { "Cubeful" } else { "Cubeless" };
    format!("{} {}-ply", kind, request.plies)
}

fn hint_text(request: &ScriptedRequest) -> String {
    let rolled = Xgid::parse(&request.xgid).map(|x| x.dice_rolled()).unwrap_or(false);
    if rolled {
        chequer_hint(request)
    } else {
        cube_hint(request)
    }
}

fn chequer_hint(request: &ScriptedRequest) -> String {
    let hash = fnv1a(&request.xgid);
    let label = evaluator(request);
    let best = spread(hash, 1, 0.6);

    let mut out = String::new();
    for rank in 0..3u64 {
        let play = PLAYS[((hash >> (rank * 8)) as usize + rank as usize) % PLAYS.len()];
        let loss = rank as f64 * (0.01 + spread(hash, rank + 2, 0.01).abs());
        let equity = best - loss;
        let suffix = if rank == 0 {
            String::new()
        } else {
            format!(" ( {:+.3})", -loss)
        };
        out.push_str(&format!(
            "    {}. {:<18}{:<28} Eq.: {:+7.3}{}\n",
            rank + 1,
            label,
            play,
            equity,
            suffix
        ));
        out.push_str(&format!("       {}\n", probabilities(hash, rank + 5)));
        out.push_str(&format!("        {}-ply cubeful prune [world class]\n", request.plies));
    }
    out
}

fn cube_hint(request: &ScriptedRequest) -> String {
    let hash = fnv1a(&request.xgid);
    let cubeless = spread(hash, 1, 0.5);
    let no_double = cubeless + 0.05;
    let take = 2.0 * cubeless - 0.1;
    let best = no_double.max(take.min(1.0));

    let options = [
        ("No double", no_double),
        ("Double, pass", 1.0),
        ("Double, take", take),
    ];

    let mut out = String::from("Cube analysis\n");
    out.push_str(&format!(
        "{}-ply cubeless equity  {:+.3}\n",
        request.cube_plies, cubeless
    ));
    out.push_str(&format!("  {}\n", probabilities(hash, 3)));
    out.push_str("Cubeful equities:\n");
    for (i, (label, equity)) in options.iter().enumerate() {
        if (equity - best).abs() < f64::EPSILON || i == 0 {
            out.push_str(&format!("{}. {:<22}{:+.3}\n", i + 1, label, equity));
        } else {
            out.push_str(&format!(
                "{}. {:<22}{:+.3}  ( {:+.3})\n",
                i + 1,
                label,
                equity,
                equity - best
            ));
        }
    }
    let action = if take > no_double { "Double, take" } else { "No double, take" };
    out.push_str(&format!("Proper cube action: {}\n", action));
    out
}

fn eval_text(request: &ScriptedRequest) -> String {
    let hash = fnv1a(&request.xgid);
    format!(
        "Position ID: {}\nEvaluator: {}\n{}\n",
        request.xgid,
        evaluator(request),
        probabilities(hash, 9)
    )
}
