// Shared test helpers for integration tests
#![allow(dead_code)]

use stage_runner::{
    CompilationTask, Compiler, CompilerRun, CompilerSettings, ProjectConfig, Result, TestProject,
    Unit,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

pub const PROPERTIES: &str = "sample.ConfigurationProperties";
pub const NESTED: &str = "sample.NestedConfigurationProperty";
pub const SIMPLE: &str = "sample.simple.SimpleProperties";
pub const HIERARCHY: &str = "sample.simple.HierarchicalProperties";
pub const NO_BRACE: &str = "sample.NoBrace";

pub fn unit(name: &str) -> Unit {
    Unit::new(name).expect("valid unit name")
}

/// A sample tree of originals plus a class path seed.
pub struct Samples {
    pub root: TempDir,
}

impl Samples {
    pub fn source_root(&self) -> PathBuf {
        self.root.path().join("originals")
    }

    pub fn seed(&self) -> PathBuf {
        self.root.path().join("classes")
    }

    pub fn config(&self) -> ProjectConfig {
        let mut config = ProjectConfig::new(self.source_root());
        config.classpath_seed = Some(self.seed());
        config.class_path = vec![PathBuf::from("/opt/annotations")];
        config.always_include = vec![unit(PROPERTIES), unit(NESTED)];
        config
    }

    pub fn original(&self, name: &str) -> String {
        fs::read_to_string(self.source_root().join(unit(name).source_path("src")))
            .expect("Failed to read original")
    }
}

fn write_original(root: &Path, name: &str, content: &str) {
    let path = root.join(unit(name).source_path("src"));
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create sample dir");
    fs::write(path, content).expect("Failed to write sample");
}

pub fn setup_samples() -> Samples {
    let root = tempdir().expect("Failed to create temporary directory");
    let originals = root.path().join("originals");

    write_original(&originals, PROPERTIES, "annotation ConfigurationProperties {\n}\n");
    write_original(&originals, NESTED, "annotation NestedConfigurationProperty {\n}\n");
    write_original(
        &originals,
        SIMPLE,
        "unit SimpleProperties {\n    // @property simple.name\n    // @property simple.counter\n}\n",
    );
    write_original(
        &originals,
        HIERARCHY,
        "unit HierarchicalProperties {\n    // @property hierarchy.first\n}\n",
    );
    write_original(&originals, NO_BRACE, "unit NoBrace\n");

    let seed = root.path().join("classes");
    fs::create_dir_all(seed.join("sample").join("simple")).unwrap();
    fs::write(seed.join("sample").join("simple").join("SimpleProperties.out"), "seeded").unwrap();
    fs::write(seed.join("marker.txt"), "seed marker").unwrap();

    Samples { root }
}

/// An in-process compiler understanding a tiny source format:
/// every `@property <name>` line yields a metadata item, every source yields
/// an artifact in the output directory, and a source containing `@error`
/// fails the compilation.
pub struct ScriptedCompiler {
    settings: CompilerSettings,
    pub tasks: RefCell<Vec<CompilationTask>>,
}

impl ScriptedCompiler {
    pub fn new(settings: CompilerSettings) -> Result<Self> {
        Ok(Self {
            settings,
            tasks: RefCell::new(Vec::new()),
        })
    }
}

impl Compiler for ScriptedCompiler {
    fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    async fn invoke(&self, task: &CompilationTask) -> Result<CompilerRun> {
        self.tasks.borrow_mut().push(task.clone());
        let mut output = String::from("Compiling\n");
        let mut success = true;

        for source in &task.sources {
            let relative = source.strip_prefix(&task.source_dir).expect("source in source dir");
            let unit = Unit::from_relative_path(relative).expect("unit path");
            let content = fs::read_to_string(source).expect("staged source readable");

            if content.contains("@error") {
                success = false;
                output.push_str(&format!(
                    "{{\"reason\":\"compiler-message\",\"level\":\"error\",\"message\":\"{} does not compile\"}}\n",
                    unit
                ));
                continue;
            }

            for line in content.lines() {
                if let Some(name) = line.split("@property ").nth(1) {
                    output.push_str(&format!(
                        "{{\"reason\":\"metadata-item\",\"source\":\"{}\",\"name\":\"{}\"}}\n",
                        unit,
                        name.trim()
                    ));
                }
            }

            let artifact = task.output_dir.join(unit.artifact_path("out"));
            fs::create_dir_all(artifact.parent().unwrap()).expect("artifact dir");
            fs::write(&artifact, "compiled").expect("artifact written");
        }

        Ok(CompilerRun { success, output })
    }
}

pub fn scripted_project(
    destination: &Path,
    samples: &Samples,
    units: &[&str],
) -> TestProject<ScriptedCompiler> {
    let units: Vec<Unit> = units.iter().map(|name| unit(name)).collect();
    TestProject::with_compiler(destination, samples.config(), &units, ScriptedCompiler::new)
        .expect("Failed to create test project")
}

/// A POSIX shell compiler for the command compiler and CLI tests, speaking
/// the same tiny source format as [`ScriptedCompiler`].
pub const SH_COMPILER_SCRIPT: &str = r##"status=0
for f in "$@"; do
  rel="${f#{source_dir}/}"
  base="${rel%.src}"
  unit=$(printf '%s' "$base" | tr / .)
  if grep -q '@error' "$f"; then
    printf '{"reason":"compiler-message","level":"error","message":"%s is broken"}\n' "$unit"
    status=1
    continue
  fi
  grep -o '@property [A-Za-z0-9_.-]*' "$f" | while read -r _ name; do
    printf '{"reason":"metadata-item","source":"%s","name":"%s"}\n' "$unit" "$name"
  done
  mkdir -p "{output}/$(dirname "$rel")"
  echo compiled > "{output}/$base.out"
done
exit $status
"##;

pub fn sh_compiler_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        SH_COMPILER_SCRIPT.to_string(),
        "sh".to_string(),
        "{sources}".to_string(),
    ]
}
