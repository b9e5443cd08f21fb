use crate::error::{Error, Result};
use crate::runtime::{Native, NativeResult, Value};
use rand::Rng;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const KNOWN_MODULES: &[&str] = &["fs", "console", "math", "random", "date", "http"];

/// Maps a module name to its capability mapping. Injected into the executor
/// so tests can substitute fakes.
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> Result<HashMap<String, Value>>;
}

/// The production resolver backing `require` with the standard modules.
pub struct StandardResolver;

impl ModuleResolver for StandardResolver {
    fn resolve(&self, name: &str) -> Result<HashMap<String, Value>> {
        match name {
            "fs" => Ok(fs_module()),
            "console" => Ok(console_module()),
            "math" => Ok(math_module()),
            "random" => Ok(random_module()),
            "date" => Ok(date_module()),
            "http" => Ok(http_module()),
            _ => Err(Error::ModuleNotFound {
                name: name.to_string(),
                available: KNOWN_MODULES.to_vec(),
            }),
        }
    }
}

// Helper macro to register a native function in a module mapping
macro_rules! define_native {
    ($module:expr, $name:expr, $func:expr) => {
        $module.insert(
            $name.to_string(),
            Value::Native(Native {
                name: $name.to_string(),
                func: Rc::new($func),
            }),
        );
    };
}

fn str_arg<'a>(args: &'a [Value], index: usize, func: &str) -> std::result::Result<&'a str, String> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(format!(
            "{func}: argument {} must be a string, got {}",
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{func}: missing argument {}", index + 1)),
    }
}

fn num_arg(args: &[Value], index: usize, func: &str) -> std::result::Result<f64, String> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n as f64),
        Some(Value::Float(n)) => Ok(*n),
        Some(other) => Err(format!(
            "{func}: argument {} must be a number, got {}",
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{func}: missing argument {}", index + 1)),
    }
}

fn int_arg(args: &[Value], index: usize, func: &str) -> std::result::Result<i64, String> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(format!(
            "{func}: argument {} must be an integer, got {}",
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{func}: missing argument {}", index + 1)),
    }
}

fn fs_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "readFile", |args: Vec<Value>| -> NativeResult {
        let path = str_arg(&args, 0, "readFile")?;
        fs::read_to_string(path)
            .map(Value::Str)
            .map_err(|e| format!("readFile: {path}: {e}"))
    });

    define_native!(module, "writeFile", |args: Vec<Value>| -> NativeResult {
        let path = str_arg(&args, 0, "writeFile")?;
        let content = args
            .get(1)
            .ok_or_else(|| "writeFile: missing argument 2".to_string())?;
        // Missing parent directories are created on the way.
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| format!("writeFile: {path}: {e}"))?;
            }
        }
        fs::write(path, content.to_string())
            .map(|_| Value::Null)
            .map_err(|e| format!("writeFile: {path}: {e}"))
    });

    define_native!(module, "appendFile", |args: Vec<Value>| -> NativeResult {
        let path = str_arg(&args, 0, "appendFile")?;
        let content = args
            .get(1)
            .ok_or_else(|| "appendFile: missing argument 2".to_string())?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("appendFile: {path}: {e}"))?;
        file.write_all(content.to_string().as_bytes())
            .map(|_| Value::Null)
            .map_err(|e| format!("appendFile: {path}: {e}"))
    });

    define_native!(module, "fileExists", |args: Vec<Value>| -> NativeResult {
        let path = str_arg(&args, 0, "fileExists")?;
        Ok(Value::Bool(Path::new(path).is_file()))
    });

    define_native!(module, "deleteFile", |args: Vec<Value>| -> NativeResult {
        let path = str_arg(&args, 0, "deleteFile")?;
        fs::remove_file(path)
            .map(|_| Value::Null)
            .map_err(|e| format!("deleteFile: {path}: {e}"))
    });

    module
}

fn join_args(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

// Console output is host-facing and bypasses the program's output sink.
fn console_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "log", |args: Vec<Value>| -> NativeResult {
        println!("[LOG] {}", join_args(&args));
        Ok(Value::Null)
    });

    define_native!(module, "info", |args: Vec<Value>| -> NativeResult {
        println!("[INFO] {}", join_args(&args));
        Ok(Value::Null)
    });

    define_native!(module, "debug", |args: Vec<Value>| -> NativeResult {
        println!("[DEBUG] {}", join_args(&args));
        Ok(Value::Null)
    });

    define_native!(module, "warn", |args: Vec<Value>| -> NativeResult {
        eprintln!("[WARN] {}", join_args(&args));
        Ok(Value::Null)
    });

    define_native!(module, "error", |args: Vec<Value>| -> NativeResult {
        eprintln!("[ERROR] {}", join_args(&args));
        Ok(Value::Null)
    });

    module
}

fn math_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "abs", |args: Vec<Value>| -> NativeResult {
        match args.first() {
            Some(Value::Int(n)) => n
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| "abs: integer overflow".to_string()),
            Some(Value::Float(n)) => Ok(Value::Float(n.abs())),
            _ => Err("abs: requires a number".to_string()),
        }
    });

    define_native!(module, "sqrt", |args: Vec<Value>| -> NativeResult {
        let n = num_arg(&args, 0, "sqrt")?;
        if n < 0.0 {
            return Err("sqrt: math domain error".to_string());
        }
        Ok(Value::Float(n.sqrt()))
    });

    define_native!(module, "pow", |args: Vec<Value>| -> NativeResult {
        match (args.first(), args.get(1)) {
            (Some(Value::Int(base)), Some(Value::Int(exp))) if *exp >= 0 => {
                let exp = u32::try_from(*exp).map_err(|_| "pow: exponent too large".to_string())?;
                base.checked_pow(exp)
                    .map(Value::Int)
                    .ok_or_else(|| "pow: integer overflow".to_string())
            }
            _ => {
                let base = num_arg(&args, 0, "pow")?;
                let exp = num_arg(&args, 1, "pow")?;
                Ok(Value::Float(base.powf(exp)))
            }
        }
    });

    define_native!(module, "floor", |args: Vec<Value>| -> NativeResult {
        match args.first() {
            Some(Value::Int(n)) => Ok(Value::Int(*n)),
            Some(Value::Float(n)) => Ok(Value::Int(n.floor() as i64)),
            _ => Err("floor: requires a number".to_string()),
        }
    });

    define_native!(module, "ceil", |args: Vec<Value>| -> NativeResult {
        match args.first() {
            Some(Value::Int(n)) => Ok(Value::Int(*n)),
            Some(Value::Float(n)) => Ok(Value::Int(n.ceil() as i64)),
            _ => Err("ceil: requires a number".to_string()),
        }
    });

    define_native!(module, "round", |args: Vec<Value>| -> NativeResult {
        match args.first() {
            Some(Value::Int(n)) => Ok(Value::Int(*n)),
            Some(Value::Float(n)) => {
                if args.len() > 1 {
                    let digits = int_arg(&args, 1, "round")?;
                    let scale = 10f64.powi(digits as i32);
                    Ok(Value::Float((n * scale).round() / scale))
                } else {
                    Ok(Value::Float(n.round()))
                }
            }
            _ => Err("round: requires a number".to_string()),
        }
    });

    define_native!(module, "min", |args: Vec<Value>| -> NativeResult {
        match (args.first(), args.get(1)) {
            (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(Value::Int(*a.min(b))),
            _ => {
                let a = num_arg(&args, 0, "min")?;
                let b = num_arg(&args, 1, "min")?;
                Ok(Value::Float(a.min(b)))
            }
        }
    });

    define_native!(module, "max", |args: Vec<Value>| -> NativeResult {
        match (args.first(), args.get(1)) {
            (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(Value::Int(*a.max(b))),
            _ => {
                let a = num_arg(&args, 0, "max")?;
                let b = num_arg(&args, 1, "max")?;
                Ok(Value::Float(a.max(b)))
            }
        }
    });

    define_native!(module, "sin", |args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(num_arg(&args, 0, "sin")?.sin()))
    });

    define_native!(module, "cos", |args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(num_arg(&args, 0, "cos")?.cos()))
    });

    define_native!(module, "tan", |args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(num_arg(&args, 0, "tan")?.tan()))
    });

    define_native!(module, "log", |args: Vec<Value>| -> NativeResult {
        let n = num_arg(&args, 0, "log")?;
        if n <= 0.0 {
            return Err("log: math domain error".to_string());
        }
        if args.len() > 1 {
            let base = num_arg(&args, 1, "log")?;
            Ok(Value::Float(n.log(base)))
        } else {
            Ok(Value::Float(n.ln()))
        }
    });

    define_native!(module, "exp", |args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(num_arg(&args, 0, "exp")?.exp()))
    });

    module.insert("pi".to_string(), Value::Float(std::f64::consts::PI));
    module.insert("e".to_string(), Value::Float(std::f64::consts::E));
    module.insert("tau".to_string(), Value::Float(std::f64::consts::TAU));
    module.insert("inf".to_string(), Value::Float(f64::INFINITY));
    module.insert("nan".to_string(), Value::Float(f64::NAN));

    module
}

fn random_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "random", |_args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(rand::thread_rng().gen()))
    });

    define_native!(module, "randFloat", |_args: Vec<Value>| -> NativeResult {
        Ok(Value::Float(rand::thread_rng().gen()))
    });

    define_native!(module, "randInt", |args: Vec<Value>| -> NativeResult {
        let start = int_arg(&args, 0, "randInt")?;
        let end = int_arg(&args, 1, "randInt")?;
        if start > end {
            return Err("randInt: start must not exceed end".to_string());
        }
        Ok(Value::Int(rand::thread_rng().gen_range(start..=end)))
    });

    define_native!(module, "uniform", |args: Vec<Value>| -> NativeResult {
        let a = num_arg(&args, 0, "uniform")?;
        let b = num_arg(&args, 1, "uniform")?;
        if a > b {
            return Err("uniform: lower bound must not exceed upper bound".to_string());
        }
        Ok(Value::Float(rand::thread_rng().gen_range(a..=b)))
    });

    module
}

fn unix_time() -> std::result::Result<std::time::Duration, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("time error: {e}"))
}

fn date_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "now", |_args: Vec<Value>| -> NativeResult {
        Ok(Value::Int(unix_time()?.as_secs() as i64))
    });

    define_native!(module, "nowMs", |_args: Vec<Value>| -> NativeResult {
        Ok(Value::Int(unix_time()?.as_millis() as i64))
    });

    module
}

fn http_module() -> HashMap<String, Value> {
    let mut module = HashMap::new();

    define_native!(module, "get", |args: Vec<Value>| -> NativeResult {
        let url = str_arg(&args, 0, "get")?;
        let response = ureq::get(url)
            .call()
            .map_err(|e| format!("HTTP GET failed: {e}"))?;
        response
            .into_string()
            .map(Value::Str)
            .map_err(|e| format!("HTTP GET failed: {e}"))
    });

    define_native!(module, "post", |args: Vec<Value>| -> NativeResult {
        let url = str_arg(&args, 0, "post")?;
        let body = args
            .get(1)
            .ok_or_else(|| "post: missing argument 2".to_string())?;
        let response = ureq::post(url)
            .send_string(&body.to_string())
            .map_err(|e| format!("HTTP POST failed: {e}"))?;
        response
            .into_string()
            .map(Value::Str)
            .map_err(|e| format!("HTTP POST failed: {e}"))
    });

    module
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(module: &HashMap<String, Value>, name: &str, args: Vec<Value>) -> NativeResult {
        match module.get(name) {
            Some(Value::Native(native)) => (native.func)(args),
            other => panic!("expected native '{name}', got {other:?}"),
        }
    }

    #[test]
    fn test_known_modules_resolve() -> Result<()> {
        for name in KNOWN_MODULES {
            assert!(!StandardResolver.resolve(name)?.is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_unknown_module() {
        let err = StandardResolver.resolve("sockets").unwrap_err();
        let Error::ModuleNotFound { name, available } = err else {
            panic!("expected ModuleNotFound, got {err}");
        };
        assert_eq!(name, "sockets");
        assert_eq!(available, KNOWN_MODULES.to_vec());
    }

    #[test]
    fn test_math_preserves_int_where_it_can() {
        let math = math_module();
        assert_eq!(call(&math, "abs", vec![Value::Int(-5)]), Ok(Value::Int(5)));
        assert_eq!(
            call(&math, "abs", vec![Value::Float(-2.5)]),
            Ok(Value::Float(2.5))
        );
        assert_eq!(
            call(&math, "pow", vec![Value::Int(2), Value::Int(10)]),
            Ok(Value::Int(1024))
        );
        assert_eq!(
            call(&math, "pow", vec![Value::Int(2), Value::Int(-1)]),
            Ok(Value::Float(0.5))
        );
        assert_eq!(
            call(&math, "floor", vec![Value::Float(2.7)]),
            Ok(Value::Int(2))
        );
        assert_eq!(
            call(&math, "ceil", vec![Value::Float(2.1)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            call(&math, "min", vec![Value::Int(3), Value::Int(7)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            call(&math, "max", vec![Value::Int(3), Value::Float(7.5)]),
            Ok(Value::Float(7.5))
        );
    }

    #[test]
    fn test_math_functions() {
        let math = math_module();
        assert_eq!(
            call(&math, "sqrt", vec![Value::Int(16)]),
            Ok(Value::Float(4.0))
        );
        assert!(call(&math, "sqrt", vec![Value::Int(-1)]).is_err());
        assert_eq!(
            call(&math, "round", vec![Value::Float(2.567), Value::Int(2)]),
            Ok(Value::Float(2.57))
        );
        assert!(matches!(math.get("pi"), Some(Value::Float(_))));
        assert!(call(&math, "log", vec![Value::Int(0)]).is_err());
    }

    #[test]
    fn test_random_ranges() {
        let random = random_module();
        for _ in 0..50 {
            let Ok(Value::Int(n)) =
                call(&random, "randInt", vec![Value::Int(1), Value::Int(6)])
            else {
                panic!("randInt failed");
            };
            assert!((1..=6).contains(&n));

            let Ok(Value::Float(f)) = call(&random, "random", vec![]) else {
                panic!("random failed");
            };
            assert!((0.0..=1.0).contains(&f));
        }
        assert!(call(&random, "randInt", vec![Value::Int(6), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_date_now() {
        let date = date_module();
        let Ok(Value::Int(secs)) = call(&date, "now", vec![]) else {
            panic!("now failed");
        };
        let Ok(Value::Int(millis)) = call(&date, "nowMs", vec![]) else {
            panic!("nowMs failed");
        };
        assert!(secs > 0);
        assert!(millis / 1000 >= secs - 1);
    }

    #[test]
    fn test_fs_round_trip() {
        let fs_mod = fs_module();
        let path = std::env::temp_dir().join(format!("rnova-test-{}.txt", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        assert_eq!(
            call(&fs_mod, "fileExists", vec![Value::Str(path.clone())]),
            Ok(Value::Bool(false))
        );
        call(
            &fs_mod,
            "writeFile",
            vec![Value::Str(path.clone()), Value::Str("hello".to_string())],
        )
        .unwrap();
        call(
            &fs_mod,
            "appendFile",
            vec![Value::Str(path.clone()), Value::Str(" world".to_string())],
        )
        .unwrap();
        assert_eq!(
            call(&fs_mod, "readFile", vec![Value::Str(path.clone())]),
            Ok(Value::Str("hello world".to_string()))
        );
        assert_eq!(
            call(&fs_mod, "fileExists", vec![Value::Str(path.clone())]),
            Ok(Value::Bool(true))
        );
        call(&fs_mod, "deleteFile", vec![Value::Str(path.clone())]).unwrap();
        assert!(call(&fs_mod, "readFile", vec![Value::Str(path)]).is_err());
    }

    #[test]
    fn test_fs_write_coerces_content() {
        let fs_mod = fs_module();
        let path = std::env::temp_dir().join(format!("rnova-coerce-{}.txt", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        call(
            &fs_mod,
            "writeFile",
            vec![Value::Str(path.clone()), Value::Int(42)],
        )
        .unwrap();
        assert_eq!(
            call(&fs_mod, "readFile", vec![Value::Str(path.clone())]),
            Ok(Value::Str("42".to_string()))
        );
        call(&fs_mod, "deleteFile", vec![Value::Str(path)]).unwrap();
    }

    #[test]
    fn test_console_and_http_surface() -> Result<()> {
        let console = StandardResolver.resolve("console")?;
        for name in ["log", "info", "debug", "warn", "error"] {
            assert!(matches!(console.get(name), Some(Value::Native(_))));
        }
        let http = StandardResolver.resolve("http")?;
        for name in ["get", "post"] {
            assert!(matches!(http.get(name), Some(Value::Native(_))));
        }
        Ok(())
    }

    #[test]
    fn test_native_argument_errors() {
        let math = math_module();
        assert!(call(&math, "sqrt", vec![]).is_err());
        assert!(call(&math, "sqrt", vec![Value::Str("4".to_string())]).is_err());
        let fs_mod = fs_module();
        assert!(call(&fs_mod, "readFile", vec![Value::Int(1)]).is_err());
    }
}
