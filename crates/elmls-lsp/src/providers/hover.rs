//! Hover rendering. Local project files win over package docs; package
//! docs are consulted in dependency declaration order.

use crate::convert::from_lsp_position;
use crate::document::DocumentManager;
use crate::resolve::{resolve_at, IdentityKind, SymbolIdentity};
use elmls_core::ast::*;
use elmls_core::docs::ModuleDocs;
use elmls_core::exposing;
use elmls_core::project::Project;
use elmls_core::ImportTracker;
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Uri};

pub struct HoverProvider;

impl HoverProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provide(
        &self,
        uri: &Uri,
        position: lsp_types::Position,
        manager: &DocumentManager,
    ) -> Option<Hover> {
        let ast = manager.ast_for(uri)?;
        let pos = from_lsp_position(position);
        let tracker = ImportTracker::new(&ast);
        let project = manager.project_for(uri);

        let defines = |module_name: &str, name: &str| -> bool {
            let Some(project) = project.as_deref() else {
                return false;
            };
            manager
                .module_ast(project, module_name)
                .map(|(_, target)| {
                    exposing::find_declaration(&target, name).is_some()
                        || exposing::find_constructor(&target, name).is_some()
                })
                .unwrap_or(false)
        };

        let identity = resolve_at(&ast, &tracker, pos, &defines)?;

        // Same-file symbols render straight from the current AST.
        let markdown = if identity.module == ast.name() {
            render_from_module(&ast, &identity)
        } else if let Some((_, target)) = project
            .as_deref()
            .and_then(|p| manager.module_ast(p, &identity.module))
        {
            render_from_module(&target, &identity)
        } else {
            render_from_docs(manager, project.as_deref()?, &identity)
        }?;

        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: markdown,
            }),
            range: None,
        })
    }
}

impl Default for HoverProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn render_from_module(module: &Module, identity: &SymbolIdentity) -> Option<String> {
    let name = &identity.name;

    if identity.kind == IdentityKind::Constructor {
        if let Some((type_decl, ctor)) = exposing::find_constructor(module, name) {
            return Some(render_constructor(module.name(), type_decl, ctor));
        }
    }

    let declaration = match exposing::find_declaration(module, name) {
        Some(declaration) => declaration,
        None => {
            // A value hit that is actually a constructor (e.g. through the
            // prelude's explicit exposing) still gets constructor hover.
            return exposing::find_constructor(module, name)
                .map(|(type_decl, ctor)| render_constructor(module.name(), type_decl, ctor));
        }
    };

    match declaration {
        Declaration::Function(func) => {
            let code = match &func.signature {
                Some(signature) => format!(
                    "{} : {}",
                    name,
                    render_type(&signature.type_annotation)
                ),
                None => name.clone(),
            };
            Some(assemble(
                &code,
                func.documentation.as_ref().map(|d| d.node.as_str()),
                module.name(),
            ))
        }
        Declaration::TypeAlias(alias) => {
            let code = format!(
                "type alias {} =\n    {}",
                name,
                render_type(&alias.type_annotation)
            );
            Some(assemble(
                &code,
                alias.documentation.as_ref().map(|d| d.node.as_str()),
                module.name(),
            ))
        }
        Declaration::CustomType(type_decl) => {
            let mut code = format!("type {}", name);
            for generic in &type_decl.generics {
                code.push(' ');
                code.push_str(&generic.node);
            }
            for (index, ctor) in type_decl.constructors.iter().enumerate() {
                let lead = if index == 0 { "=" } else { "|" };
                code.push_str(&format!("\n    {} {}", lead, render_constructor_line(ctor)));
            }
            Some(assemble(
                &code,
                type_decl.documentation.as_ref().map(|d| d.node.as_str()),
                module.name(),
            ))
        }
        Declaration::Port(port) => {
            let code = format!(
                "port {} : {}",
                name,
                render_type(&port.signature.type_annotation)
            );
            Some(assemble(&code, None, module.name()))
        }
        _ => None,
    }
}

fn render_constructor(module_name: &str, type_decl: &CustomTypeDecl, ctor: &Constructor) -> String {
    format!(
        "```elm\n{}\n```\n\nConstructor of `{}`\n\n*{}*",
        render_constructor_line(ctor),
        type_decl.name.node,
        module_name
    )
}

fn render_constructor_line(ctor: &Constructor) -> String {
    let mut line = ctor.name.node.clone();
    for arg in &ctor.arguments {
        line.push(' ');
        line.push_str(&render_type_atomic(arg));
    }
    line
}

fn render_from_docs(
    manager: &DocumentManager,
    project: &Project,
    identity: &SymbolIdentity,
) -> Option<String> {
    for dependency in &project.dependencies {
        let docs = manager.projects().load_docs(dependency);
        let Some(module) = docs.iter().find(|m| m.name == identity.module) else {
            continue;
        };
        if let Some(markdown) = render_docs_entry(module, identity) {
            return Some(markdown);
        }
    }
    None
}

fn render_docs_entry(docs: &ModuleDocs, identity: &SymbolIdentity) -> Option<String> {
    let name = &identity.name;

    if let Some((union, _)) = docs.union_with_constructor(name) {
        let args = union
            .cases
            .iter()
            .find(|(case, _)| case == name)
            .map(|(_, args)| args.join(" "))
            .unwrap_or_default();
        let line = if args.is_empty() {
            name.clone()
        } else {
            format!("{name} {args}")
        };
        return Some(format!(
            "```elm\n{}\n```\n\nConstructor of `{}`\n\n*{}*",
            line, union.name, docs.name
        ));
    }

    if let Some(value) = docs
        .values
        .iter()
        .chain(docs.binops.iter())
        .find(|v| &v.name == name)
    {
        let code = format!("{} : {}", value.name, value.type_);
        return Some(assemble(&code, non_empty(&value.comment), &docs.name));
    }

    if let Some(alias) = docs.aliases.iter().find(|a| &a.name == name) {
        let code = format!("type alias {} =\n    {}", alias.name, alias.type_);
        return Some(assemble(&code, non_empty(&alias.comment), &docs.name));
    }

    if let Some(union) = docs.unions.iter().find(|u| &u.name == name) {
        let mut code = format!("type {}", union.name);
        for arg in &union.args {
            code.push(' ');
            code.push_str(arg);
        }
        for (index, (case, args)) in union.cases.iter().enumerate() {
            let lead = if index == 0 { "=" } else { "|" };
            if args.is_empty() {
                code.push_str(&format!("\n    {lead} {case}"));
            } else {
                code.push_str(&format!("\n    {lead} {case} {}", args.join(" ")));
            }
        }
        return Some(assemble(&code, non_empty(&union.comment), &docs.name));
    }

    None
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn assemble(code: &str, documentation: Option<&str>, module_name: &str) -> String {
    let mut out = format!("```elm\n{code}\n```\n");
    if let Some(doc) = documentation {
        out.push('\n');
        out.push_str(doc);
        out.push('\n');
    }
    out.push_str(&format!("\n*{module_name}*"));
    out
}

/// Structural rendering of a type annotation, matching how it would be
/// written in source.
pub(crate) fn render_type(annotation: &TypeAnnotation) -> String {
    match &annotation.kind {
        TypeAnnotationKind::GenericType(name) => name.clone(),
        TypeAnnotationKind::Unit => "()".to_string(),
        TypeAnnotationKind::Typed { name, args } => {
            let mut out = match name.node.qualifier() {
                Some(qualifier) => format!("{}.{}", qualifier, name.node.name),
                None => name.node.name.clone(),
            };
            for arg in args {
                out.push(' ');
                out.push_str(&render_type_atomic(arg));
            }
            out
        }
        TypeAnnotationKind::Tupled(items) => {
            let rendered: Vec<String> = items.iter().map(render_type).collect();
            format!("( {} )", rendered.join(", "))
        }
        TypeAnnotationKind::Record(fields) => render_record(None, fields),
        TypeAnnotationKind::GenericRecord { base, fields } => {
            render_record(Some(base.node.as_str()), fields)
        }
        TypeAnnotationKind::FunctionType(left, right) => {
            // A function on the left needs parens to keep arrows right
            // associated.
            let left_rendered = match left.kind {
                TypeAnnotationKind::FunctionType(_, _) => format!("({})", render_type(left)),
                _ => render_type(left),
            };
            format!("{} -> {}", left_rendered, render_type(right))
        }
    }
}

fn render_record(base: Option<&str>, fields: &[RecordField]) -> String {
    if fields.is_empty() && base.is_none() {
        return "{}".to_string();
    }
    let rendered: Vec<String> = fields
        .iter()
        .map(|field| format!("{} : {}", field.name.node, render_type(&field.type_annotation)))
        .collect();
    match base {
        Some(base) => format!("{{ {} | {} }}", base, rendered.join(", ")),
        None => format!("{{ {} }}", rendered.join(", ")),
    }
}

/// Like `render_type` but parenthesized when the type would not parse as a
/// single argument.
fn render_type_atomic(annotation: &TypeAnnotation) -> String {
    match &annotation.kind {
        TypeAnnotationKind::FunctionType(_, _) => format!("({})", render_type(annotation)),
        TypeAnnotationKind::Typed { args, .. } if !args.is_empty() => {
            format!("({})", render_type(annotation))
        }
        _ => render_type(annotation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmls_core::parse;
    use indoc::indoc;

    fn first_signature_rendering(source: &str) -> String {
        let module = parse(source).unwrap();
        match &module.declarations[0] {
            Declaration::Function(func) => {
                render_type(&func.signature.as_ref().unwrap().type_annotation)
            }
            Declaration::TypeAlias(alias) => render_type(&alias.type_annotation),
            other => panic!("unexpected declaration {other:?}"),
        }
    }

    #[test]
    fn renders_function_arrows() {
        let rendered = first_signature_rendering(
            "module M exposing (..)\n\nupdate : Msg -> Model -> Model\nupdate msg model =\n    model\n",
        );
        assert_eq!(rendered, "Msg -> Model -> Model");
    }

    #[test]
    fn parenthesizes_function_on_the_left() {
        let rendered = first_signature_rendering(
            "module M exposing (..)\n\nmap : (a -> b) -> Maybe a -> Maybe b\nmap f m =\n    m\n",
        );
        assert_eq!(rendered, "(a -> b) -> Maybe a -> Maybe b");
    }

    #[test]
    fn renders_records_tuples_and_unit() {
        let rendered = first_signature_rendering(
            "module M exposing (..)\n\ntype alias T =\n    { pos : ( Int, Int ), done : () }\n",
        );
        assert_eq!(rendered, "{ pos : ( Int, Int ), done : () }");
    }

    #[test]
    fn renders_generic_records() {
        let rendered = first_signature_rendering(
            "module M exposing (..)\n\ntype alias Named r =\n    { r | name : String }\n",
        );
        assert_eq!(rendered, "{ r | name : String }");
    }

    #[test]
    fn renders_qualified_types_with_args() {
        let rendered = first_signature_rendering(
            "module M exposing (..)\n\ndecoder : Json.Decode.Decoder (List String)\ndecoder =\n    d\n",
        );
        assert_eq!(rendered, "Json.Decode.Decoder (List String)");
    }

    #[test]
    fn assembles_code_doc_and_footer() {
        let markdown = assemble("add : Int -> Int", Some("Adds."), "Helpers");
        assert_eq!(markdown, "```elm\nadd : Int -> Int\n```\n\nAdds.\n\n*Helpers*");
    }
}
