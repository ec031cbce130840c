use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{CallSite, CodeSymbol, FileSymbols, ImportBinding, SymbolKind};
use std::collections::HashMap;
use tree_sitter::{Node, Parser};

/// Tree-sitter based extractor of declarations, imports and call sites.
///
/// One `extract` call handles one file and returns a fresh [`FileSymbols`];
/// nothing is carried over between calls except the cached parsers.
pub struct SymbolExtractor {
    parsers: HashMap<Language, Parser>,
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Extract symbols, imports and calls from one source file.
    ///
    /// Returns [`ChunkerError::ParseError`] when the tree contains syntax
    /// errors and [`ChunkerError::UnsupportedLanguage`] for unknown extensions.
    pub fn extract(&mut self, file_path: &str, source: &str) -> Result<FileSymbols> {
        let language = Language::from_path(file_path);
        let parser = self.parser_for(language)?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ChunkerError::parse(format!("{file_path}: parser returned no tree")))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ChunkerError::parse(format!(
                "{file_path}: syntax error near line {}",
                first_error_line(root)
            )));
        }

        let mut walk = Walk {
            source,
            file_path,
            out: FileSymbols::default(),
        };
        walk.program(root);

        log::debug!(
            "Extracted {} symbols, {} imports, {} calls from {}",
            walk.out.symbols.len(),
            walk.out.imports.len(),
            walk.out.calls.len(),
            file_path
        );
        Ok(walk.out)
    }

    fn parser_for(&mut self, language: Language) -> Result<&mut Parser> {
        if !self.parsers.contains_key(&language) {
            let ts_language = language.tree_sitter_language()?;
            let mut parser = Parser::new();
            parser
                .set_language(&ts_language)
                .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;
            self.parsers.insert(language, parser);
        }
        self.parsers
            .get_mut(&language)
            .ok_or_else(|| ChunkerError::unsupported_language(language.as_str()))
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

fn is_function_literal(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

struct Walk<'a> {
    source: &'a str,
    file_path: &'a str,
    out: FileSymbols,
}

impl<'a> Walk<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn name_of(&self, node: Node) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .filter(|name| !name.is_empty())
    }

    fn push_symbol(&mut self, name: String, kind: SymbolKind, node: Node, exported: bool) {
        self.out.symbols.push(CodeSymbol {
            name,
            kind,
            file_path: self.file_path.to_string(),
            span_start: node.start_position().row + 1,
            span_end: node.end_position().row + 1,
            exported,
        });
    }

    /// Top-level statements only; nested declarations are not symbols.
    fn program(&mut self, root: Node) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.import_statement(child),
                "export_statement" => {
                    if let Some(declaration) = child.child_by_field_name("declaration") {
                        self.declaration(declaration, true);
                    } else {
                        self.calls(child, None);
                    }
                }
                _ => self.declaration(child, false),
            }
        }
    }

    fn declaration(&mut self, node: Node, exported: bool) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                let Some(name) = self.name_of(node) else {
                    self.calls(node, None);
                    return;
                };
                self.push_symbol(name.clone(), SymbolKind::Function, node, exported);
                self.calls(node, Some(&name));
            }
            "class_declaration" | "abstract_class_declaration" => self.class(node, exported),
            "interface_declaration" => {
                if let Some(name) = self.name_of(node) {
                    self.push_symbol(name, SymbolKind::Interface, node, exported);
                }
            }
            "type_alias_declaration" => {
                if let Some(name) = self.name_of(node) {
                    self.push_symbol(name, SymbolKind::Type, node, exported);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() == "variable_declarator" {
                        self.variable(declarator, exported);
                    }
                }
            }
            _ => self.calls(node, None),
        }
    }

    fn variable(&mut self, declarator: Node, exported: bool) {
        let name = declarator
            .child_by_field_name("name")
            .filter(|n| n.kind() == "identifier")
            .map(|n| self.text(n).to_string());
        let value = declarator.child_by_field_name("value");
        let is_function = value.is_some_and(|v| is_function_literal(v.kind()));

        match name {
            Some(name) => {
                let kind = if is_function {
                    SymbolKind::Function
                } else {
                    SymbolKind::Variable
                };
                self.push_symbol(name.clone(), kind, declarator, exported);
                if let Some(value) = value {
                    let context = is_function.then_some(name.as_str());
                    self.calls(value, context);
                }
            }
            // Destructuring patterns declare no single symbol.
            None => {
                if let Some(value) = value {
                    self.calls(value, None);
                }
            }
        }
    }

    fn class(&mut self, node: Node, exported: bool) {
        let Some(class_name) = self.name_of(node) else {
            self.calls(node, None);
            return;
        };
        self.push_symbol(class_name.clone(), SymbolKind::Class, node, exported);

        if let Some(heritage) = node
            .children(&mut node.walk())
            .find(|c| c.kind() == "class_heritage")
        {
            self.calls(heritage, None);
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "method_definition" {
                if let Some(method) = self.name_of(member) {
                    let qualified = format!("{class_name}.{method}");
                    self.push_symbol(qualified.clone(), SymbolKind::Function, member, exported);
                    self.calls(member, Some(&qualified));
                    continue;
                }
            }
            self.calls(member, None);
        }
    }

    fn import_statement(&mut self, node: Node) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let module_path = self
            .text(source)
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_string();

        let mut bindings: Vec<(String, bool)> = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_clause" => self.import_clause(child, &mut bindings),
                "import_require_clause" => {
                    if let Some(ident) = child
                        .named_children(&mut child.walk())
                        .find(|c| c.kind() == "identifier")
                    {
                        bindings.push((self.text(ident).to_string(), true));
                    }
                }
                _ => {}
            }
        }

        if bindings.is_empty() {
            bindings.push(("*".to_string(), false));
        }

        for (imported_name, is_default) in bindings {
            self.out.imports.push(ImportBinding {
                imported_name,
                module_path: module_path.clone(),
                file_path: self.file_path.to_string(),
                is_default,
            });
        }
    }

    fn import_clause(&self, clause: Node, bindings: &mut Vec<(String, bool)>) {
        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" => bindings.push((self.text(part).to_string(), true)),
                "namespace_import" => {
                    if let Some(ident) = part
                        .named_children(&mut part.walk())
                        .find(|c| c.kind() == "identifier")
                    {
                        bindings.push((self.text(ident).to_string(), false));
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = part.walk();
                    for spec in part.named_children(&mut spec_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let imported = spec.child_by_field_name("name");
                        let local = spec.child_by_field_name("alias").or(imported);
                        if let Some(local) = local {
                            let is_default =
                                imported.is_some_and(|n| self.text(n) == "default");
                            bindings.push((self.text(local).to_string(), is_default));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Record every call expression below `node`, attributed to `context`.
    /// Named nested functions take over as the context of their own body.
    fn calls(&mut self, node: Node, context: Option<&str>) {
        if let Some(name) = self.nested_function_name(node) {
            self.calls_below(node, Some(&name));
            return;
        }

        if node.kind() == "call_expression" {
            if let Some(callee) = node
                .child_by_field_name("function")
                .and_then(|f| self.callee_name(f))
            {
                self.out.calls.push(CallSite {
                    caller_symbol: context.map(ToString::to_string),
                    callee_name: callee,
                    file_path: self.file_path.to_string(),
                    line: node.start_position().row + 1,
                });
            }
        }
        self.calls_below(node, context);
    }

    fn calls_below(&mut self, node: Node, context: Option<&str>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.calls(child, context);
        }
    }

    /// `function inner() {}` or `const inner = () => {}`; anonymous
    /// literals keep the enclosing context.
    fn nested_function_name(&self, node: Node) -> Option<String> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => self.name_of(node),
            "variable_declarator" => {
                let value = node.child_by_field_name("value")?;
                if !is_function_literal(value.kind()) {
                    return None;
                }
                node.child_by_field_name("name")
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| self.text(n).to_string())
            }
            _ => None,
        }
    }

    fn callee_name(&self, function: Node) -> Option<String> {
        match function.kind() {
            "identifier" => Some(self.text(function).to_string()),
            "member_expression" => {
                let method = self.text(function.child_by_field_name("property")?);
                match function.child_by_field_name("object") {
                    Some(object) if object.kind() == "identifier" => {
                        Some(format!("{}.{method}", self.text(object)))
                    }
                    _ => Some(method.to_string()),
                }
            }
            _ => None,
        }
    }
}
