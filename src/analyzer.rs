//! Semantic analysis (§4.2): one post-order walk that resolves names,
//! assigns types, and enforces the typing rules, producing an
//! [AnalyzedProgram].
//!
//! Per Design Decision D1 (see `SPEC_FULL.md`), resolved information is
//! never written back onto the AST nodes. It is collected in
//! [Resolutions], a set of `NodeId`-keyed tables returned alongside the
//! (unchanged) [Source] tree.
use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::ast::*;
use crate::error::AnalysisError;
use crate::scope::ScopeStack;
use crate::types::Type;

/// What the analyzer learns about an [Expr::Access] node: which variable it
/// names, under what target spelling, and whether that variable is
/// mutable.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub target_name: String,
    pub ty: Type,
    pub mutable: bool,
}

/// What the analyzer learns about an [Expr::Call] node: which function it
/// names and that function's signature.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub target_name: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
}

/// The side table populated by [analyze]. Every [Expr] node's type is
/// recorded in `expr_types`; [Expr::Access] and [Expr::Call] nodes
/// additionally get an entry in `access_vars` / `call_funcs`.
///
/// The *defining* occurrence of every variable -- a [Global], a function
/// parameter, or a `LET` [Stmt::Declaration] -- also gets an entry (in
/// `global_vars` / `function_params` / `declared_vars` respectively), and
/// every [Function] gets an entry in `function_decls`. The Generator reads
/// these definition-site entries for the type and (possibly disambiguated,
/// see [Analyzer::fresh_local_target_name]) target name it needs to emit,
/// rather than re-deriving them from the raw AST.
#[derive(Debug, Default)]
pub struct Resolutions {
    expr_types: HashMap<NodeId, Type>,
    access_vars: HashMap<NodeId, VariableInfo>,
    call_funcs: HashMap<NodeId, FunctionInfo>,
    global_vars: HashMap<NodeId, VariableInfo>,
    declared_vars: HashMap<NodeId, VariableInfo>,
    function_decls: HashMap<NodeId, FunctionInfo>,
    function_params: HashMap<NodeId, Vec<VariableInfo>>,
}

impl Resolutions {
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        self.expr_types.get(&id).copied()
    }

    pub fn variable_of(&self, id: NodeId) -> Option<&VariableInfo> {
        self.access_vars.get(&id)
    }

    pub fn function_of(&self, id: NodeId) -> Option<&FunctionInfo> {
        self.call_funcs.get(&id)
    }

    /// The resolved type and (unshadowed) target name of a `Global`,
    /// looked up by the `Global`'s own [NodeId].
    pub fn global_of(&self, id: NodeId) -> Option<&VariableInfo> {
        self.global_vars.get(&id)
    }

    /// The resolved type and target name of a `LET` declaration, looked up
    /// by the [Stmt::Declaration]'s own [NodeId].
    pub fn declared_of(&self, id: NodeId) -> Option<&VariableInfo> {
        self.declared_vars.get(&id)
    }

    /// The resolved signature and target name of a `Function`, looked up
    /// by the [Function]'s own [NodeId].
    pub fn function_decl_of(&self, id: NodeId) -> Option<&FunctionInfo> {
        self.function_decls.get(&id)
    }

    /// The resolved type and (possibly disambiguated) target name of each
    /// of a `Function`'s parameters, in declaration order.
    pub fn params_of(&self, id: NodeId) -> Option<&[VariableInfo]> {
        self.function_params.get(&id).map(Vec::as_slice)
    }
}

/// A [Source] AST paired with the resolution table the analyzer produced
/// for it. This is the contract both the interpreter and the generator
/// consume.
#[derive(Debug)]
pub struct AnalyzedProgram {
    pub source: Source,
    pub resolutions: Resolutions,
}

#[derive(Clone)]
struct ScopeVariable {
    target_name: String,
    ty: Type,
    mutable: bool,
}

#[derive(Clone)]
struct ScopeFunction {
    target_name: String,
    param_types: Vec<Type>,
    return_type: Type,
}

/// Runs semantic analysis over a parsed [Source], returning the resolved
/// program or the first [AnalysisError] encountered. Matches §4.2/§7:
/// analysis aborts immediately on the first violation, with no partial
/// recovery.
pub fn analyze(source: Source) -> Result<AnalyzedProgram, AnalysisError> {
    let mut analyzer = Analyzer::new();
    analyzer.analyze_source(&source)?;
    Ok(AnalyzedProgram { source, resolutions: analyzer.resolutions })
}

struct Analyzer {
    scope: ScopeStack<ScopeVariable, ScopeFunction>,
    resolutions: Resolutions,
    /// Return types of functions currently being analyzed, innermost last.
    /// PLC has no nested function declarations, so this is at most one
    /// deep in practice, but it is a stack (not an `Option`) to make that
    /// an observation rather than an assumption baked into the type.
    function_return_types: Vec<Type>,
    /// How many times each source name has been bound as a local (function
    /// parameter or `LET` declaration) within the function currently being
    /// analyzed. Cleared at the start of every function. PLC's lexically
    /// nested scopes let an inner `LET` legally shadow an outer local of
    /// the same name (§3), but a Java method body has a single flat local
    /// namespace -- a nested block may not redeclare a name still in
    /// scope in an enclosing block. This counter drives
    /// [Analyzer::fresh_local_target_name], which gives every binding past
    /// the first one of a given name a disambiguated target name, so the
    /// Generator never emits a locally-redeclared Java identifier.
    local_name_seq: HashMap<String, usize>,
}

impl Analyzer {
    fn new() -> Self {
        let mut analyzer = Analyzer {
            scope: ScopeStack::new(),
            resolutions: Resolutions::default(),
            function_return_types: Vec::new(),
            local_name_seq: HashMap::new(),
        };
        analyzer.register_builtins();
        analyzer
    }

    /// Returns a target name for a local binding (function parameter or
    /// `LET` declaration): the source name itself the first time it's
    /// bound in the current function, or `name__2`, `name__3`, ... for
    /// every rebinding after that (including legal PLC shadowing in a
    /// nested scope, which has no counterpart in a flattened Java method
    /// body -- see `local_name_seq`).
    fn fresh_local_target_name(&mut self, source_name: &str) -> String {
        let count = self.local_name_seq.entry(source_name.to_owned()).or_insert(0);
        *count += 1;
        if *count == 1 {
            source_name.to_owned()
        } else {
            format!("{source_name}__{count}")
        }
    }

    /// Pre-registers the three builtins in the root scope (§4.4: "Builtins
    /// pre-registered in the root interpreter scope"), so ordinary call
    /// resolution finds them exactly like a user-defined function -- a
    /// program that declares its own `print/1` collides with this entry and
    /// is rejected the same way any other duplicate definition would be.
    fn register_builtins(&mut self) {
        self.scope.define_function(
            "print",
            1,
            ScopeFunction { target_name: "print".to_owned(), param_types: vec![Type::Any], return_type: Type::Nil },
        );
        self.scope.define_function(
            "logarithm",
            1,
            ScopeFunction {
                target_name: "logarithm".to_owned(),
                param_types: vec![Type::Decimal],
                return_type: Type::Decimal,
            },
        );
        self.scope.define_function(
            "converter",
            2,
            ScopeFunction {
                target_name: "converter".to_owned(),
                param_types: vec![Type::Integer, Type::Integer],
                return_type: Type::String,
            },
        );
    }

    fn resolve_type(&self, name: &str, offset: usize) -> Result<Type, AnalysisError> {
        Type::from_display_name(name)
            .ok_or_else(|| AnalysisError::at(format!("unknown type '{name}'"), offset))
    }

    fn check_assignable(
        &self,
        target: Type,
        source: Type,
        offset: usize,
        context: &str,
    ) -> Result<(), AnalysisError> {
        if target.is_assignable_from(source) {
            Ok(())
        } else {
            Err(AnalysisError::at(
                format!(
                    "{context}: expected a value assignable to {}, found {}",
                    target.display_name(),
                    source.display_name()
                ),
                offset,
            ))
        }
    }

    // ---- Source ----

    fn analyze_source(&mut self, source: &Source) -> Result<(), AnalysisError> {
        for global in &source.globals {
            self.analyze_global(global)?;
        }
        for function in &source.functions {
            self.analyze_function(function)?;
        }

        let main = self.scope.lookup_function("main", 0);
        match main {
            Some(main) if main.return_type == Type::Integer => Ok(()),
            Some(_) => Err(AnalysisError::new("'main' must return Integer")),
            None => Err(AnalysisError::new("program declares no zero-argument 'main' function")),
        }
    }

    fn analyze_global(&mut self, global: &Global) -> Result<(), AnalysisError> {
        let declared_type = self.resolve_type(&global.type_name, global.offset)?;

        if let Some(initializer) = &global.initializer {
            if global.kind == GlobalKind::List {
                self.analyze_list_initializer(initializer, declared_type)?;
            } else {
                let initializer_type = self.analyze_expr(initializer)?;
                self.check_assignable(
                    declared_type,
                    initializer_type,
                    global.offset,
                    "global initializer",
                )?;
            }
        }

        let defined = self.scope.define_variable(
            &global.name,
            ScopeVariable {
                target_name: global.name.clone(),
                ty: declared_type,
                mutable: global.mutable,
            },
        );
        if !defined {
            return Err(AnalysisError::at(
                format!("'{}' is already defined in this scope", global.name),
                global.offset,
            ));
        }
        self.resolutions.global_vars.insert(
            global.id,
            VariableInfo { target_name: global.name.clone(), ty: declared_type, mutable: global.mutable },
        );
        Ok(())
    }

    /// A `LIST` global's initializer is the one place [Expr::List] is
    /// legal (§4.2): every element's type must be assignable to the
    /// global's declared (element) type.
    fn analyze_list_initializer(
        &mut self,
        initializer: &Expr,
        declared_type: Type,
    ) -> Result<(), AnalysisError> {
        let Expr::List { id, elements, offset } = initializer else {
            return Err(AnalysisError::at(
                "internal error: LIST global initializer must be a list literal",
                initializer.offset(),
            ));
        };
        for element in elements {
            let element_type = self.analyze_expr(element)?;
            self.check_assignable(declared_type, element_type, *offset, "list element")?;
        }
        self.resolutions.expr_types.insert(*id, declared_type);
        Ok(())
    }

    // ---- Function ----

    fn analyze_function(&mut self, function: &Function) -> Result<(), AnalysisError> {
        let mut param_types = Vec::with_capacity(function.param_type_names.len());
        for type_name in &function.param_type_names {
            param_types.push(self.resolve_type(type_name, function.offset)?);
        }
        let return_type = match &function.return_type_name {
            Some(name) => self.resolve_type(name, function.offset)?,
            None => Type::Nil,
        };

        // Defined in the enclosing scope *before* the body is analyzed, so
        // a recursive call inside the body resolves.
        let defined = self.scope.define_function(
            &function.name,
            function.arity(),
            ScopeFunction { target_name: function.name.clone(), param_types: param_types.clone(), return_type },
        );
        if !defined {
            return Err(AnalysisError::at(
                format!(
                    "function '{}' with {} parameter(s) is already defined",
                    function.name,
                    function.arity()
                ),
                function.offset,
            ));
        }
        self.resolutions.function_decls.insert(
            function.id,
            FunctionInfo { target_name: function.name.clone(), param_types: param_types.clone(), return_type },
        );

        self.function_return_types.push(return_type);
        self.local_name_seq.clear();
        self.scope.push_child();
        let mut param_infos = Vec::with_capacity(function.param_names.len());
        for (name, ty) in function.param_names.iter().zip(param_types.iter()) {
            let target_name = self.fresh_local_target_name(name);
            self.scope.define_variable(
                name,
                ScopeVariable { target_name: target_name.clone(), ty: *ty, mutable: true },
            );
            param_infos.push(VariableInfo { target_name, ty: *ty, mutable: true });
        }
        self.resolutions.function_params.insert(function.id, param_infos);
        let body_result = self.analyze_block(&function.body);
        self.scope.pop();
        self.function_return_types.pop();
        body_result
    }

    // ---- Statements ----

    fn analyze_block(&mut self, block: &[Stmt]) -> Result<(), AnalysisError> {
        for stmt in block {
            self.analyze_stmt(stmt)?;
        }
        Ok(())
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) -> Result<(), AnalysisError> {
        match stmt {
            Stmt::Expression(expr) => {
                if !matches!(expr, Expr::Call { .. }) {
                    return Err(AnalysisError::at(
                        "an expression statement must be a function call",
                        expr.offset(),
                    ));
                }
                self.analyze_expr(expr)?;
                Ok(())
            }
            Stmt::Declaration { id, name, type_name, initializer, offset } => {
                self.analyze_declaration(*id, name, type_name.as_deref(), initializer.as_ref(), *offset)
            }
            Stmt::Assignment { receiver, value, offset } => {
                self.analyze_assignment(receiver, value, *offset)
            }
            Stmt::If { cond, then_branch, else_branch, offset } => {
                self.analyze_if(cond, then_branch, else_branch, *offset)
            }
            Stmt::Switch { cond, cases, offset } => self.analyze_switch(cond, cases, *offset),
            Stmt::While { cond, body, offset } => self.analyze_while(cond, body, *offset),
            Stmt::Return { value, offset, .. } => self.analyze_return(value, *offset),
        }
    }

    fn analyze_declaration(
        &mut self,
        id: NodeId,
        name: &str,
        type_name: Option<&str>,
        initializer: Option<&Expr>,
        offset: usize,
    ) -> Result<(), AnalysisError> {
        if type_name.is_none() && initializer.is_none() {
            return Err(AnalysisError::at(
                format!("declaration of '{name}' needs a type, an initializer, or both"),
                offset,
            ));
        }

        let declared_type = type_name.map(|n| self.resolve_type(n, offset)).transpose()?;
        let initializer_type = initializer.map(|e| self.analyze_expr(e)).transpose()?;

        let ty = match (declared_type, initializer_type) {
            (Some(declared), Some(found)) => {
                self.check_assignable(declared, found, offset, "declaration initializer")?;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(found)) => found,
            (None, None) => unreachable!("checked above"),
        };

        let target_name = self.fresh_local_target_name(name);
        let defined = self.scope.define_variable(
            name,
            ScopeVariable { target_name: target_name.clone(), ty, mutable: true },
        );
        if !defined {
            return Err(AnalysisError::at(
                format!("'{name}' is already defined in this scope"),
                offset,
            ));
        }
        self.resolutions.declared_vars.insert(id, VariableInfo { target_name, ty, mutable: true });
        Ok(())
    }

    fn analyze_assignment(
        &mut self,
        receiver: &Expr,
        value: &Expr,
        offset: usize,
    ) -> Result<(), AnalysisError> {
        if !matches!(receiver, Expr::Access { .. }) {
            return Err(AnalysisError::at(
                "the left side of an assignment must be a variable (or indexed variable)",
                offset,
            ));
        }
        let receiver_type = self.analyze_expr(receiver)?;
        let value_type = self.analyze_expr(value)?;
        // Mutability of the receiver is intentionally not checked here --
        // §4.2 defers that to the interpreter at runtime.
        self.check_assignable(receiver_type, value_type, offset, "assignment")
    }

    fn analyze_if(
        &mut self,
        cond: &Expr,
        then_branch: &[Stmt],
        else_branch: &[Stmt],
        offset: usize,
    ) -> Result<(), AnalysisError> {
        let cond_type = self.analyze_expr(cond)?;
        if cond_type != Type::Boolean {
            return Err(AnalysisError::at("'IF' condition must be Boolean", offset));
        }
        if then_branch.is_empty() {
            return Err(AnalysisError::at("'IF' then-branch must not be empty", offset));
        }
        self.scope.push_child();
        let then_result = self.analyze_block(then_branch);
        self.scope.pop();
        then_result?;

        self.scope.push_child();
        let else_result = self.analyze_block(else_branch);
        self.scope.pop();
        else_result
    }

    fn analyze_switch(&mut self, cond: &Expr, cases: &[Case], offset: usize) -> Result<(), AnalysisError> {
        let cond_type = self.analyze_expr(cond)?;
        if cases.is_empty() {
            return Err(AnalysisError::at("'SWITCH' must have a 'DEFAULT' case", offset));
        }
        let last = cases.len() - 1;
        for (i, case) in cases.iter().enumerate() {
            let is_default = i == last;
            match (&case.value, is_default) {
                (Some(_), true) => {
                    return Err(AnalysisError::at(
                        "the final 'SWITCH' case must be 'DEFAULT' (no value)",
                        case.offset,
                    ))
                }
                (None, false) => {
                    return Err(AnalysisError::at(
                        "only the final 'SWITCH' case may omit a value",
                        case.offset,
                    ))
                }
                _ => {}
            }
            if let Some(value) = &case.value {
                let value_type = self.analyze_expr(value)?;
                self.check_assignable(cond_type, value_type, case.offset, "case value")?;
            }
            self.scope.push_child();
            let body_result = self.analyze_block(&case.body);
            self.scope.pop();
            body_result?;
        }
        Ok(())
    }

    fn analyze_while(&mut self, cond: &Expr, body: &[Stmt], offset: usize) -> Result<(), AnalysisError> {
        let cond_type = self.analyze_expr(cond)?;
        if cond_type != Type::Boolean {
            return Err(AnalysisError::at("'WHILE' condition must be Boolean", offset));
        }
        self.scope.push_child();
        let result = self.analyze_block(body);
        self.scope.pop();
        result
    }

    fn analyze_return(&mut self, value: &Expr, offset: usize) -> Result<(), AnalysisError> {
        let Some(&return_type) = self.function_return_types.last() else {
            return Err(AnalysisError::at("'RETURN' outside of a function", offset));
        };
        let value_type = self.analyze_expr(value)?;
        self.check_assignable(return_type, value_type, offset, "return value")
    }

    // ---- Expressions ----

    fn analyze_expr(&mut self, expr: &Expr) -> Result<Type, AnalysisError> {
        let ty = match expr {
            Expr::Literal { value, offset, .. } => self.analyze_literal(value, *offset)?,
            Expr::Group { inner, offset, .. } => self.analyze_group(inner, *offset)?,
            Expr::Binary { op, left, right, offset, .. } => self.analyze_binary(op, left, right, *offset)?,
            Expr::Access { name, index, offset, id } => self.analyze_access(name, index.as_deref(), *offset, *id)?,
            Expr::Call { name, args, offset, id } => self.analyze_call(name, args, *offset, *id)?,
            Expr::List { offset, .. } => {
                return Err(AnalysisError::at(
                    "internal error: a list literal may only appear as a LIST global's initializer",
                    *offset,
                ))
            }
        };
        self.resolutions.expr_types.insert(expr.id(), ty);
        Ok(ty)
    }

    fn analyze_literal(&self, literal: &Literal, offset: usize) -> Result<Type, AnalysisError> {
        match literal {
            Literal::Nil => Ok(Type::Nil),
            Literal::Boolean(_) => Ok(Type::Boolean),
            Literal::Character(_) => Ok(Type::Character),
            Literal::String(_) => Ok(Type::String),
            Literal::Integer(value) => {
                if fits_i32(value) {
                    Ok(Type::Integer)
                } else {
                    Err(AnalysisError::at(
                        format!("integer literal {value} is out of 32-bit range"),
                        offset,
                    ))
                }
            }
            Literal::Decimal(value) => {
                let as_f64 = value.to_string().parse::<f64>().unwrap_or(f64::INFINITY);
                if as_f64.is_finite() {
                    Ok(Type::Decimal)
                } else {
                    Err(AnalysisError::at(format!("decimal literal {value} is out of range"), offset))
                }
            }
        }
    }

    fn analyze_group(&mut self, inner: &Expr, offset: usize) -> Result<Type, AnalysisError> {
        if !matches!(inner, Expr::Binary { .. }) {
            return Err(AnalysisError::at("a parenthesized group must wrap a binary expression", offset));
        }
        self.analyze_expr(inner)
    }

    fn analyze_binary(&mut self, op: &str, left: &Expr, right: &Expr, offset: usize) -> Result<Type, AnalysisError> {
        let left_type = self.analyze_expr(left)?;
        let right_type = self.analyze_expr(right)?;
        use Type::*;
        match op {
            "&&" | "||" => {
                if left_type == Boolean && right_type == Boolean {
                    Ok(Boolean)
                } else {
                    Err(AnalysisError::at(format!("'{op}' requires two Boolean operands"), offset))
                }
            }
            "<" | ">" | "==" | "!=" => {
                if Comparable.is_assignable_from(left_type)
                    && Comparable.is_assignable_from(right_type)
                    && left_type == right_type
                {
                    Ok(Boolean)
                } else {
                    Err(AnalysisError::at(
                        format!(
                            "'{op}' requires two operands of the same Comparable type, found {} and {}",
                            left_type.display_name(),
                            right_type.display_name()
                        ),
                        offset,
                    ))
                }
            }
            "+" => {
                if left_type == String || right_type == String {
                    Ok(String)
                } else if left_type == Integer && right_type == Integer {
                    Ok(Integer)
                } else if left_type == Decimal && right_type == Decimal {
                    Ok(Decimal)
                } else {
                    Err(AnalysisError::at(
                        format!(
                            "'+' cannot combine {} and {}",
                            left_type.display_name(),
                            right_type.display_name()
                        ),
                        offset,
                    ))
                }
            }
            "-" | "*" | "/" => {
                if left_type == Integer && right_type == Integer {
                    Ok(Integer)
                } else if left_type == Decimal && right_type == Decimal {
                    Ok(Decimal)
                } else {
                    Err(AnalysisError::at(
                        format!(
                            "'{op}' requires two Integer or two Decimal operands, found {} and {}",
                            left_type.display_name(),
                            right_type.display_name()
                        ),
                        offset,
                    ))
                }
            }
            "^" => {
                if left_type == Integer && right_type == Integer {
                    Ok(Integer)
                } else {
                    Err(AnalysisError::at("'^' requires two Integer operands", offset))
                }
            }
            other => Err(AnalysisError::at(format!("unknown operator '{other}'"), offset)),
        }
    }

    fn analyze_access(
        &mut self,
        name: &str,
        index: Option<&Expr>,
        offset: usize,
        id: NodeId,
    ) -> Result<Type, AnalysisError> {
        let variable = self
            .scope
            .lookup_variable(name)
            .ok_or_else(|| AnalysisError::at(format!("undefined variable '{name}'"), offset))?;

        if let Some(index_expr) = index {
            let index_type = self.analyze_expr(index_expr)?;
            if index_type != Type::Integer {
                return Err(AnalysisError::at("list index must be Integer", offset));
            }
        }

        self.resolutions.access_vars.insert(
            id,
            VariableInfo {
                target_name: variable.target_name.clone(),
                ty: variable.ty,
                mutable: variable.mutable,
            },
        );
        Ok(variable.ty)
    }

    fn analyze_call(&mut self, name: &str, args: &[Expr], offset: usize, id: NodeId) -> Result<Type, AnalysisError> {
        let function = self.scope.lookup_function(name, args.len()).ok_or_else(|| {
            AnalysisError::at(format!("undefined function '{name}' with {} argument(s)", args.len()), offset)
        })?;

        for (arg, &param_type) in args.iter().zip(function.param_types.iter()) {
            let arg_type = self.analyze_expr(arg)?;
            self.check_assignable(param_type, arg_type, offset, "call argument")?;
        }

        self.resolutions.call_funcs.insert(
            id,
            FunctionInfo {
                target_name: function.target_name.clone(),
                param_types: function.param_types.clone(),
                return_type: function.return_type,
            },
        );
        Ok(function.return_type)
    }
}

fn fits_i32(value: &BigInt) -> bool {
    value.to_i32().is_some()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn analyze_str(source: &str) -> Result<AnalyzedProgram, AnalysisError> {
        let tokens = scan(source);
        let ast = parse(&tokens).expect("source must parse");
        analyze(ast)
    }

    #[test]
    fn accepts_minimal_main() {
        analyze_str("FUN main(): Integer DO RETURN 0; END").unwrap();
    }

    #[test]
    fn print_builtin_resolves_without_a_user_declaration() {
        analyze_str(r#"FUN main(): Integer DO print("hi"); RETURN 0; END"#).unwrap();
    }

    #[test]
    fn redeclaring_a_builtin_name_is_rejected() {
        analyze_str("FUN print(x: Integer): Nil DO RETURN NIL; END FUN main(): Integer DO RETURN 0; END")
            .unwrap_err();
    }

    #[test]
    fn converter_builtin_resolves_with_two_integer_arguments() {
        let program =
            analyze_str("FUN main(): Integer DO print(converter(255, 16)); RETURN 0; END").unwrap();
        let Stmt::Expression(Expr::Call { args, .. }) = &program.source.functions[0].body[0] else {
            panic!("expected a call statement");
        };
        assert_eq!(program.resolutions.type_of(args[0].id()), Some(Type::String));
    }

    #[test]
    fn rejects_missing_main() {
        let err = analyze_str("FUN other(): Integer DO RETURN 0; END").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn rejects_main_with_wrong_return_type() {
        analyze_str("FUN main(): Decimal DO RETURN 0.0; END").unwrap_err();
    }

    #[test]
    fn global_initializer_must_be_assignable() {
        analyze_str("VAL x: Integer = \"nope\"; FUN main(): Integer DO RETURN 0; END").unwrap_err();
    }

    #[test]
    fn string_concatenation_coerces_other_side() {
        let program = analyze_str(
            r#"FUN main(): Integer DO LET s: String = "x=" + 1; RETURN 0; END"#,
        )
        .unwrap();
        // find the declaration's initializer expr id and confirm it resolved to String
        let Stmt::Declaration { initializer: Some(expr), .. } = &program.source.functions[0].body[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(program.resolutions.type_of(expr.id()), Some(Type::String));
    }

    #[test]
    fn mixed_arithmetic_fails_analysis() {
        analyze_str("FUN main(): Integer DO LET x: Integer = 1 + 1.5; RETURN 0; END").unwrap_err();
    }

    #[test]
    fn recursive_function_resolves_self_call() {
        analyze_str(
            "FUN fact(n: Integer): Integer DO RETURN fact(n); END FUN main(): Integer DO RETURN fact(0); END",
        )
        .unwrap();
    }

    #[test]
    fn return_outside_function_is_rejected() {
        // Every statement must live inside a function body per the grammar,
        // so this is exercised through a SWITCH default that tries to
        // return from an otherwise-valid function -- which IS allowed --
        // contrasted against an analyzer-level unit check:
        let mut analyzer = Analyzer::new();
        let expr = Expr::Literal { id: NodeId(0), value: Literal::Integer(BigInt::from(0)), offset: 0 };
        assert!(analyzer.analyze_return(&expr, 0).is_err());
    }

    #[test]
    fn switch_requires_default_last() {
        analyze_str(
            "FUN main(): Integer DO LET x: Integer = 1; SWITCH x CASE 1: RETURN 1; END END",
        )
        .unwrap_err();
    }

    #[test]
    fn list_literal_outside_global_initializer_is_rejected() {
        let tokens = scan("FUN main(): Integer DO RETURN 0; END");
        let mut ast = parse(&tokens).unwrap();
        // Hand-construct an illegal List expression to exercise the guard,
        // since the grammar itself never produces one outside a global.
        ast.functions[0].body[0] = Stmt::Return {
            id: NodeId(100),
            value: Expr::List { id: NodeId(101), elements: vec![], offset: 0 },
            offset: 0,
        };
        assert!(analyze(ast).is_err());
    }

    #[test]
    fn scope_depth_is_restored_after_failure() {
        let mut analyzer = Analyzer::new();
        let depth_before = analyzer.scope.depth();
        let tokens = scan("FUN main(): Integer DO IF TRUE DO LET x: Integer = \"bad\"; END RETURN 0; END");
        let ast = parse(&tokens).unwrap();
        assert!(analyzer.analyze_source(&ast).is_err());
        assert_eq!(analyzer.scope.depth(), depth_before);
    }
}
