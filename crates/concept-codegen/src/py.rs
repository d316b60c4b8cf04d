//! Python code generator: dataclasses for inputs/completions, a `Protocol`
//! handler contract, a `requests`-based transport adapter, and (when the
//! manifest declares invariants) a `unittest` conformance file.

use crate::generator::{GeneratedFile, Generator};
use crate::naming::pascal_case;
use concept_domain::manifest::RelationField;
use concept_domain::{ConceptManifest, GeneratorError, ResolvedType};

pub struct PythonGenerator;

impl Generator for PythonGenerator {
    fn target(&self) -> &'static str {
        "python"
    }

    fn generate(&self, manifest: &ConceptManifest) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let name = pascal_case(&manifest.name);
        let mut files = vec![
            GeneratedFile { path: format!("{}/types.py", manifest.name), content: generate_types(manifest) },
            GeneratedFile { path: format!("{}/handler.py", manifest.name), content: generate_handler(manifest, &name) },
            GeneratedFile { path: format!("{}/transport.py", manifest.name), content: generate_transport(manifest, &name) },
        ];
        if !manifest.invariants.is_empty() {
            files.push(GeneratedFile {
                path: format!("{}/test_conformance.py", manifest.name),
                content: generate_conformance(manifest, &name),
            });
        }
        Ok(files)
    }
}

fn py_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Primitive { wire } => match wire.as_str() {
            "Int" => "int".to_string(),
            "Float" => "float".to_string(),
            "Bool" => "bool".to_string(),
            "Bytes" => "bytes".to_string(),
            _ => "str".to_string(),
        },
        ResolvedType::Param { .. } => "str".to_string(),
        ResolvedType::Set { element } => format!("set[{}]", py_type(element)),
        ResolvedType::List { element } => format!("list[{}]", py_type(element)),
        ResolvedType::Option { element } => format!("Optional[{}]", py_type(element)),
        ResolvedType::Map { value, .. } => format!("dict[str, {}]", py_type(value)),
        ResolvedType::Record { fields } => {
            let inner: Vec<String> = fields.iter().map(|(n, t)| format!("\"{}\": {}", n, py_type(t))).collect();
            format!("dict[str, Any]  # {{ {} }}", inner.join(", "))
        }
    }
}

fn field_lines(fields: &[RelationField]) -> String {
    fields
        .iter()
        .map(|f| {
            let ty = if f.optional { format!("Optional[{}]", py_type(&f.ty)) } else { py_type(&f.ty) };
            format!("    {}: {}", f.name, ty)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn generate_types(manifest: &ConceptManifest) -> String {
    let mut out = String::from("from dataclasses import dataclass\nfrom typing import Optional, Any, Literal\n\n");
    for action in &manifest.actions {
        let input_name = format!("{}Input", pascal_case(&action.name));
        out.push_str(&format!("@dataclass\nclass {input_name}:\n{}\n\n", non_empty(&field_lines(&action.params))));

        let mut variant_names = Vec::new();
        for variant in &action.variants {
            let vname = format!("{}{}Completion", pascal_case(&action.name), pascal_case(&variant.tag));
            variant_names.push(vname.clone());
            let mut body = format!("    variant: Literal[\"{}\"]", variant.tag);
            if !variant.fields.is_empty() {
                body.push('\n');
                body.push_str(&field_lines(&variant.fields));
            }
            out.push_str(&format!("@dataclass\nclass {vname}:\n{body}\n\n"));
        }
        let union_name = format!("{}Completion", pascal_case(&action.name));
        out.push_str(&format!("{} = {}\n\n", union_name, variant_names.join(" | ")));
    }
    out
}

fn non_empty(s: &str) -> String {
    if s.is_empty() {
        "    pass".to_string()
    } else {
        s.to_string()
    }
}

fn generate_handler(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("from typing import Protocol\nfrom .types import *\n\n\nclass {name}Handler(Protocol):\n");
    for action in &manifest.actions {
        out.push_str(&format!(
            "    def {}(self, input: {}Input) -> {}Completion: ...\n",
            action.name,
            pascal_case(&action.name),
            pascal_case(&action.name)
        ));
    }
    out
}

fn generate_transport(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("import requests\nfrom .types import *\n\n\nclass {name}HttpTransport:\n    def __init__(self, base_url: str) -> None:\n        self.base_url = base_url\n\n");
    for action in &manifest.actions {
        out.push_str(&format!(
            "    def {0}(self, input: {1}Input) -> {1}Completion:\n        response = requests.post(f\"{{self.base_url}}/invoke\", json={{\"concept\": \"{2}\", \"action\": \"{0}\", \"input\": input.__dict__}})\n        return response.json()\n\n",
            action.name,
            pascal_case(&action.name),
            manifest.uri,
        ));
    }
    out
}

fn generate_conformance(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("import unittest\nfrom .transport import {name}HttpTransport\n\n");
    for (i, invariant) in manifest.invariants.iter().enumerate() {
        out.push_str(&format!("class Invariant{i}(unittest.TestCase):\n"));
        out.push_str(&format!("    \"\"\"{}\"\"\"\n\n", invariant.description));
        out.push_str("    def test_holds(self) -> None:\n");
        out.push_str(&format!("        transport = {name}HttpTransport(\"http://localhost\")\n"));
        for fv in &invariant.free_variables {
            out.push_str(&format!("        {} = \"{}\"\n", fv.name, fv.test_value));
        }
        for step in invariant.setup.iter().chain(invariant.assertions.iter()) {
            let args: Vec<String> = step.field_equalities.iter().map(|(k, v)| format!("{}={}", k, py_literal(v))).collect();
            out.push_str(&format!(
                "        result = transport.{}({})\n        self.assertEqual(result[\"variant\"], \"{}\")\n",
                step.action,
                args.join(", "),
                step.expected_variant
            ));
        }
        out.push('\n');
    }
    out
}

fn py_literal(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Bool(b) => if *b { "True".to_string() } else { "False".to_string() },
        serde_json::Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::password_manifest;

    #[test]
    fn emits_the_full_bundle() {
        let manifest = password_manifest();
        let files = PythonGenerator.generate(&manifest).unwrap();
        assert_eq!(files.len(), 4);
        let conformance = files.iter().find(|f| f.path.ends_with("test_conformance.py")).unwrap();
        assert!(conformance.content.contains("u-test-invariant-001"));
        assert!(conformance.content.contains("True"));
        assert!(conformance.content.contains("False"));
    }
}
