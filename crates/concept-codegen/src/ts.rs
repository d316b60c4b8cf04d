//! TypeScript code generator: emits types, a handler interface, an HTTP
//! transport adapter, and (when the manifest declares invariants) a
//! conformance test file.

use crate::generator::{GeneratedFile, Generator};
use crate::naming::pascal_case;
use concept_domain::manifest::RelationField;
use concept_domain::{ConceptManifest, GeneratorError, ResolvedType};

pub struct TypeScriptGenerator;

impl Generator for TypeScriptGenerator {
    fn target(&self) -> &'static str {
        "typescript"
    }

    fn generate(&self, manifest: &ConceptManifest) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let name = pascal_case(&manifest.name);
        let mut files = vec![
            GeneratedFile { path: format!("{}/types.ts", manifest.name), content: generate_types(manifest) },
            GeneratedFile { path: format!("{}/handler.ts", manifest.name), content: generate_handler(manifest, &name) },
            GeneratedFile { path: format!("{}/transport.ts", manifest.name), content: generate_transport(manifest, &name) },
        ];
        if !manifest.invariants.is_empty() {
            files.push(GeneratedFile {
                path: format!("{}/conformance.test.ts", manifest.name),
                content: generate_conformance(manifest, &name),
            });
        }
        Ok(files)
    }
}

fn ts_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Primitive { wire } => match wire.as_str() {
            "Int" | "Float" => "number".to_string(),
            "Bool" => "boolean".to_string(),
            _ => "string".to_string(),
        },
        ResolvedType::Param { .. } => "string".to_string(),
        ResolvedType::Set { element } | ResolvedType::List { element } => format!("{}[]", ts_type(element)),
        ResolvedType::Option { element } => format!("{} | undefined", ts_type(element)),
        ResolvedType::Map { value, .. } => format!("Record<string, {}>", ts_type(value)),
        ResolvedType::Record { fields } => {
            let inner: Vec<String> = fields.iter().map(|(n, t)| format!("{}: {}", n, ts_type(t))).collect();
            format!("{{ {} }}", inner.join("; "))
        }
    }
}

fn field_lines(fields: &[RelationField]) -> String {
    fields
        .iter()
        .map(|f| format!("  {}{}: {};", f.name, if f.optional { "?" } else { "" }, ts_type(&f.ty)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn generate_types(manifest: &ConceptManifest) -> String {
    let mut out = String::new();
    for action in &manifest.actions {
        let input_name = format!("{}Input", pascal_case(&action.name));
        out.push_str(&format!("export interface {input_name} {{\n{}\n}}\n\n", field_lines(&action.params)));

        let mut variant_names = Vec::new();
        for variant in &action.variants {
            let vname = format!("{}{}Completion", pascal_case(&action.name), pascal_case(&variant.tag));
            variant_names.push(vname.clone());
            let mut body = format!("  variant: \"{}\";", variant.tag);
            if !variant.fields.is_empty() {
                body.push('\n');
                body.push_str(&field_lines(&variant.fields));
            }
            out.push_str(&format!("export interface {vname} {{\n{body}\n}}\n\n"));
        }
        let union_name = format!("{}Completion", pascal_case(&action.name));
        out.push_str(&format!("export type {union_name} = {};\n\n", variant_names.join(" | ")));
    }
    out
}

fn generate_handler(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("export interface {name}Handler {{\n");
    for action in &manifest.actions {
        out.push_str(&format!(
            "  {}(input: {}Input): Promise<{}Completion>;\n",
            action.name,
            pascal_case(&action.name),
            pascal_case(&action.name)
        ));
    }
    out.push_str("}\n");
    out
}

fn generate_transport(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("import type {{ {name}Handler }} from \"./handler\";\n\n");
    out.push_str(&format!("export class {name}HttpTransport implements {name}Handler {{\n"));
    out.push_str("  constructor(private readonly baseUrl: string) {}\n\n");
    for action in &manifest.actions {
        out.push_str(&format!(
            "  async {0}(input: {1}Input): Promise<{1}Completion> {{\n    const res = await fetch(`${{this.baseUrl}}/invoke`, {{\n      method: \"POST\",\n      headers: {{ \"content-type\": \"application/json\" }},\n      body: JSON.stringify({{ concept: \"{2}\", action: \"{0}\", input }}),\n    }});\n    return res.json();\n  }}\n\n",
            action.name,
            pascal_case(&action.name),
            manifest.uri,
        ));
    }
    out.push_str("}\n");
    out
}

fn generate_conformance(manifest: &ConceptManifest, name: &str) -> String {
    let mut out = format!("import {{ describe, it, expect }} from \"vitest\";\nimport {{ {name}HttpTransport }} from \"./transport\";\n\n");
    for invariant in &manifest.invariants {
        out.push_str(&format!("describe(\"{}\", () => {{\n", invariant.description.replace('"', "'")));
        out.push_str("  it(\"holds for the generated test fixture\", async () => {\n");
        out.push_str(&format!("    const transport = new {name}HttpTransport(\"http://localhost\");\n"));
        for fv in &invariant.free_variables {
            out.push_str(&format!("    const {} = \"{}\";\n", fv.name, fv.test_value));
        }
        for step in invariant.setup.iter().chain(invariant.assertions.iter()) {
            let args: Vec<String> = step.field_equalities.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            out.push_str(&format!(
                "    {{ const result = await transport.{}({{ {} }}); expect(result.variant).toBe(\"{}\"); }}\n",
                step.action,
                args.join(", "),
                step.expected_variant
            ));
        }
        out.push_str("  });\n});\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::password_manifest;

    #[test]
    fn emits_types_handler_transport_and_conformance() {
        let manifest = password_manifest();
        let files = TypeScriptGenerator.generate(&manifest).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"password/types.ts"));
        assert!(paths.contains(&"password/handler.ts"));
        assert!(paths.contains(&"password/transport.ts"));
        assert!(paths.contains(&"password/conformance.test.ts"));
        let conformance = files.iter().find(|f| f.path.ends_with("conformance.test.ts")).unwrap();
        assert!(conformance.content.contains("u-test-invariant-001"));
        assert!(conformance.content.contains("\"secret\""));
        assert!(conformance.content.contains("\"wrong\""));
    }
}
