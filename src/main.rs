//! Command-line front end: collect a student's attributes and print Pass/Fail.

use std::io::Write;
use std::path::{Path, PathBuf};

use gradecast::artifacts::{Artifacts, BUNDLED_ARTIFACTS_DIR};
use gradecast::config;
use gradecast::form::StudentForm;
use gradecast::logging;
use gradecast::predict::{Prediction, predict};
use gradecast::record::RawInputRecord;
use serde::Serialize;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    artifacts_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    record_path: Option<PathBuf>,
    json: bool,
    list_categories: bool,
    form: FormArgs,
}

/// Form values given on the command line; unset ones take the form defaults.
#[derive(Debug, Clone, Default)]
struct FormArgs {
    gender: Option<String>,
    nationality: Option<String>,
    class_level: Option<i64>,
    age: Option<i64>,
    school_type: Option<String>,
    main_administration: Option<String>,
    candidacy_type: Option<String>,
}

impl FormArgs {
    fn is_empty(&self) -> bool {
        self.gender.is_none()
            && self.nationality.is_none()
            && self.class_level.is_none()
            && self.age.is_none()
            && self.school_type.is_none()
            && self.main_administration.is_none()
            && self.candidacy_type.is_none()
    }

    fn apply(self, form: &mut StudentForm) {
        if let Some(value) = self.gender {
            form.gender = value;
        }
        if let Some(value) = self.nationality {
            form.nationality = value;
        }
        if let Some(value) = self.class_level {
            form.class_level = value;
        }
        if let Some(value) = self.age {
            form.age = value;
        }
        if let Some(value) = self.school_type {
            form.school_type = value;
        }
        if let Some(value) = self.main_administration {
            form.main_administration = value;
        }
        if let Some(value) = self.candidacy_type {
            form.candidacy_type = value;
        }
    }
}

#[derive(Serialize)]
struct JsonOutput {
    label: Prediction,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;

    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let stdout = std::io::stdout();
    execute(options, &mut stdout.lock())
}

/// Load the artifacts and write the requested output to `out`.
fn execute(options: CliOptions, out: &mut impl Write) -> Result<(), String> {
    let app_config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let paths = app_config
        .artifacts
        .resolve_or_bundled(
            options.artifacts_dir.as_deref(),
            Path::new(BUNDLED_ARTIFACTS_DIR),
        )
        .map_err(|err| err.to_string())?;
    let artifacts = Artifacts::load(&paths).map_err(|err| err.to_string())?;

    if options.list_categories {
        for column in artifacts.encoders().columns() {
            let classes = artifacts.encoders().classes(column).unwrap_or_default();
            writeln!(out, "{column}: {}", classes.join(", ")).map_err(|err| err.to_string())?;
        }
        return Ok(());
    }

    let record = match &options.record_path {
        Some(path) => read_record(path)?,
        None => {
            let mut form =
                StudentForm::defaults(artifacts.encoders()).map_err(|err| err.to_string())?;
            options.form.apply(&mut form);
            form.validate(artifacts.encoders())
                .map_err(|err| err.to_string())?;
            form.to_record()
        }
    };

    let prediction = predict(&artifacts, &record).map_err(|err| err.user_message().to_string())?;
    let line = if options.json {
        serde_json::to_string(&JsonOutput { label: prediction }).map_err(|err| err.to_string())?
    } else {
        match prediction {
            Prediction::Pass => "Congratulations! You have passed.".to_string(),
            Prediction::Fail => "Sorry, you have failed.".to_string(),
        }
    };
    writeln!(out, "{line}").map_err(|err| err.to_string())
}

fn read_record(path: &Path) -> Result<RawInputRecord, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| format!("Invalid record {}: {err}", path.display()))
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--json" => options.json = true,
            "--list-categories" => options.list_categories = true,
            "--artifacts" => options.artifacts_dir = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--config" => options.config_path = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--record" => options.record_path = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--gender" => options.form.gender = Some(value(&args, &mut idx)?),
            "--nationality" => options.form.nationality = Some(value(&args, &mut idx)?),
            "--class-level" => options.form.class_level = Some(integer(flag, &args, &mut idx)?),
            "--age" => options.form.age = Some(integer(flag, &args, &mut idx)?),
            "--school-type" => options.form.school_type = Some(value(&args, &mut idx)?),
            "--main-administration" => {
                options.form.main_administration = Some(value(&args, &mut idx)?)
            }
            "--candidacy-type" => options.form.candidacy_type = Some(value(&args, &mut idx)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    if options.record_path.is_some() && !options.form.is_empty() {
        return Err("--record cannot be combined with individual field flags".to_string());
    }
    Ok(options)
}

fn value(args: &[String], idx: &mut usize) -> Result<String, String> {
    let flag = &args[*idx];
    *idx += 1;
    args.get(*idx)
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn integer(flag: &str, args: &[String], idx: &mut usize) -> Result<i64, String> {
    let raw = value(args, idx)?;
    raw.parse::<i64>()
        .map_err(|_| format!("Invalid {flag} value: {raw}"))
}

fn help_text() -> String {
    [
        "gradecast",
        "",
        "Predict whether a student will pass or fail.",
        "",
        "Usage:",
        "  gradecast [field flags] [--artifacts <dir>] [--config <file>] [--json]",
        "  gradecast --record <file.json> [--artifacts <dir>] [--json]",
        "  gradecast --list-categories [--artifacts <dir>]",
        "",
        "Field flags (unset fields use the form defaults):",
        "  --gender <Female|Male>",
        "  --nationality <Saudi|Non-Saudi>",
        "  --class-level <1|2|3>",
        "  --age <15..30>                 (default 20)",
        "  --school-type <class>          (see --list-categories)",
        "  --main-administration <class>  (see --list-categories)",
        "  --candidacy-type <Self-Candidacy|Talented-Candidacy>",
        "",
        "Options:",
        "  --artifacts <dir>   Directory holding the fitted artifacts",
        "                      (default: <config dir>/.gradecast/artifacts, or the",
        "                      bundled demo artifacts while that is empty)",
        "  --config <file>     Alternate gradecast.toml",
        "  --record <file>     Raw JSON record, passed to the model as-is",
        "  --json              Print {\"label\": \"Pass\"|\"Fail\"}",
        "  --list-categories   Print the fitted classes of each encoded column",
    ]
    .join("\n")
}
