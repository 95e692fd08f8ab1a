use std::path::{Path, PathBuf};

use anyhow::bail;
use itertools::Itertools;
use serde::{de::{Error, MapAccess, Visitor}, Deserialize, Deserializer};

const TESTCASES: usize = 8;


#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Boolean(bool),
    Integer(i64),
    Printed(String), // Compared against the printed form of the value
}

/// Expected outcome of one program. Errors are identified by their kind name only.
pub struct EvaluationResult(Result<TestOutput, String>);

impl From<EvaluationResult> for Result<TestOutput, String> {
    fn from(value: EvaluationResult) -> Self {
        value.0
    }
}

struct EvaluationResultVisitor {}

impl<'de> Deserialize<'de> for EvaluationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de> {

        deserializer.deserialize_map(EvaluationResultVisitor {})
    }
}

impl<'de> Visitor<'de> for EvaluationResultVisitor {
    type Value = EvaluationResult;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure containing the boolean key 'ok'. If it's okay, contains the key 'output', otherwise the key 'type'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>, {

        if map.next_key::<String>()?.as_deref() != Some("ok") {
            return Err(A::Error::custom("First key should be 'ok'"))
        }

        let ok: bool = map.next_value()?;
        let expected_key = if ok { "output" } else { "type" };
        if map.next_key::<String>()?.as_deref() != Some(expected_key) {
            return Err(A::Error::custom(format!("Second key should be '{}'", expected_key)))
        }

        let result = if ok {
            EvaluationResult(Ok(map.next_value::<TestOutput>()?))
        } else {
            EvaluationResult(Err(map.next_value::<String>()?))
        };

        // Error entries may carry a human readable message, which is not compared
        while let Some(key) = map.next_key::<String>()? {
            if ok || key != "message" {
                return Err(A::Error::custom(format!("Unexpected key '{}'", key)));
            }
            map.next_value::<String>()?;
        }

        Ok(result)
    }
}

/// Programs in an input file are separated by blank lines.
fn load_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let source = std::fs::read_to_string(path)?;
    let mut programs = vec![];
    let mut current: Vec<&str> = vec![];

    for line in source.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() { programs.push(current.drain(..).join("\n")); }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() { programs.push(current.join("\n")); }

    Ok(programs)
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<EvaluationResult>> {
    let source = std::fs::read(path)?;
    let result: Vec<EvaluationResult> = serde_json::from_slice(&source)?;
    Ok(result)
}

pub fn load_test_pair(testcase: usize) -> anyhow::Result<Vec<(String, EvaluationResult)>> {
    if testcase < 1 || testcase > TESTCASES { bail!("Testcase out of bounds"); }

    let base_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let input = load_input_file(base_path.join("test_inputs").join(format!("{}.vul", testcase)))?;
    let output = load_output_file(base_path.join("test_outputs").join(format!("{}.json", testcase)))?;

    if input.len() != output.len() { bail!("Input and output of testcase {} does not match", testcase); }
    Ok(input.into_iter().zip(output.into_iter()).collect_vec())
}

pub fn all_testcases() -> impl Iterator<Item = usize> {
    1..=TESTCASES
}
