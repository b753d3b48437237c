//! Tree-walking evaluator over an analyzed program (§4.4).
//!
//! Mirrors the teacher's `vm.rs` run loop (`run`, `binary_op`,
//! `runtime_error`) but walks the [crate::ast] recursion instead of
//! dispatching a bytecode array -- there is no bytecode format in this
//! crate (see `DESIGN.md`'s final-trim entry for the modules that went
//! away with it).
//!
//! The interpreter keeps its own [ScopeStack], independent of the
//! analyzer's (§4.4: "fresh scope stack, distinct from the analyzer's"),
//! and does its own name resolution by walking that stack rather than
//! consulting [crate::analyzer::Resolutions] -- see Design Decision D1 in
//! `SPEC_FULL.md`.
use std::cell::RefCell;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::analyzer::AnalyzedProgram;
use crate::ast::*;
use crate::error::RuntimeError;
use crate::scope::{ScopeHandle, ScopeStack};
use crate::types::Type;
use crate::value::Value;

/// A runtime variable cell (§3's "Variable"): shared via `Rc<RefCell<_>>`
/// so that looking a name up in the scope and later assigning through it
/// mutate the same storage, rather than a detached copy.
#[derive(Debug)]
pub struct Variable {
    pub target_name: String,
    pub ty: Type,
    pub mutable: bool,
    pub value: Value,
}

type VarCell = Rc<RefCell<Variable>>;

/// A callable PLC function (§3's "Function value"): its signature plus an
/// invocable body and the scope that was active when it was bound. Every
/// PLC function is declared at the top level, so `closure` is always the
/// interpreter's global scope -- but it is carried explicitly rather than
/// assumed, matching the distilled spec's "closure capturing the defining
/// lexical scope".
pub struct FunctionValue {
    pub target_name: String,
    pub param_names: Vec<String>,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub body: Vec<Stmt>,
    pub closure: ScopeHandle<VarCell, Rc<FunctionValue>>,
}

/// What a statement did: ran to completion (`Next`) or is unwinding a
/// `RETURN` (`Return(value)`). Re-expresses the distilled spec's
/// non-local-throw `RETURN` as an ordinary value per the design notes --
/// never a panic, always structurally distinct from [RuntimeError].
enum Flow {
    Next,
    Return(Value),
}

/// Tree-walking evaluator. Generic over the `print` builtin's output sink
/// (§6: "a user-provided output channel"); [Interpreter::new] is the usual
/// entry point, defaulting to standard output.
pub struct Interpreter<W: Write> {
    scope: ScopeStack<VarCell, Rc<FunctionValue>>,
    output: W,
}

impl Interpreter<io::Stdout> {
    /// An interpreter that writes `print` output to standard output.
    pub fn new() -> Self {
        Interpreter::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// An interpreter that writes `print` output to `output` -- tests use
    /// this to capture output into an in-memory buffer instead of stdout.
    pub fn with_output(output: W) -> Self {
        Interpreter { scope: ScopeStack::new(), output }
    }

    /// Binds every global, then every function, then invokes `main()` with
    /// no arguments, returning its result (§4.4's "Top-level").
    pub fn run(&mut self, program: &AnalyzedProgram) -> Result<Value, RuntimeError> {
        for global in &program.source.globals {
            self.bind_global(global)?;
        }
        for function in &program.source.functions {
            self.bind_function(function);
        }
        let main = self.scope.lookup_function("main", 0).ok_or(RuntimeError::MissingMain)?;
        self.call_function(&main, Vec::new())
    }

    fn bind_global(&mut self, global: &Global) -> Result<(), RuntimeError> {
        let value = match &global.initializer {
            Some(expr) => self.eval_expr(expr)?,
            None => Value::Nil,
        };
        let ty = value.kind();
        let cell = Rc::new(RefCell::new(Variable {
            target_name: global.name.clone(),
            ty,
            mutable: global.mutable,
            value,
        }));
        self.scope.define_variable(&global.name, cell);
        Ok(())
    }

    fn bind_function(&mut self, function: &Function) {
        let closure = self.scope.root();
        let param_types = function
            .param_type_names
            .iter()
            .map(|name| Type::from_display_name(name).unwrap_or(Type::Any))
            .collect();
        let return_type = function
            .return_type_name
            .as_deref()
            .and_then(Type::from_display_name)
            .unwrap_or(Type::Nil);
        let value = Rc::new(FunctionValue {
            target_name: function.name.clone(),
            param_names: function.param_names.clone(),
            param_types,
            return_type,
            body: function.body.clone(),
            closure,
        });
        self.scope.define_function(&function.name, function.arity(), value);
    }

    fn call_function(&mut self, function: &Rc<FunctionValue>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let saved = mem::replace(&mut self.scope, ScopeStack::child_of(&function.closure));
        for (name, (ty, value)) in function
            .param_names
            .iter()
            .zip(function.param_types.iter().copied().zip(args))
        {
            let cell = Rc::new(RefCell::new(Variable {
                target_name: name.clone(),
                ty,
                mutable: true,
                value,
            }));
            self.scope.define_variable(name, cell);
        }
        let flow = self.exec_block(&function.body);
        self.scope = saved;
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::Nil),
        }
    }

    /// Runs `body` inside a freshly pushed child scope, popping it
    /// afterwards regardless of outcome -- the interpreter-level sibling of
    /// [ScopeStack::with_child] (§5/§7's scope-unwinding invariant).
    fn in_child_scope<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        self.scope.push_child();
        let result = body(self);
        self.scope.pop();
        result
    }

    // ---- Statements ----

    fn exec_block(&mut self, block: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in block {
            match self.exec_stmt(stmt)? {
                Flow::Next => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Next)
            }
            Stmt::Declaration { name, initializer, .. } => self.exec_declaration(name, initializer.as_ref()),
            Stmt::Assignment { receiver, value, .. } => self.exec_assignment(receiver, value),
            Stmt::If { cond, then_branch, else_branch, .. } => self.exec_if(cond, then_branch, else_branch),
            Stmt::Switch { cond, cases, .. } => self.exec_switch(cond, cases),
            Stmt::While { cond, body, .. } => self.exec_while(cond, body),
            Stmt::Return { value, .. } => Ok(Flow::Return(self.eval_expr(value)?)),
        }
    }

    fn exec_declaration(&mut self, name: &str, initializer: Option<&Expr>) -> Result<Flow, RuntimeError> {
        let value = match initializer {
            Some(expr) => self.eval_expr(expr)?,
            None => Value::Nil,
        };
        let ty = value.kind();
        let cell = Rc::new(RefCell::new(Variable { target_name: name.to_owned(), ty, mutable: true, value }));
        self.scope.define_variable(name, cell);
        Ok(Flow::Next)
    }

    fn exec_assignment(&mut self, receiver: &Expr, value: &Expr) -> Result<Flow, RuntimeError> {
        let Expr::Access { name, index, .. } = receiver else {
            unreachable!("the analyzer guarantees assignment receivers are Access nodes")
        };
        let new_value = self.eval_expr(value)?;
        let cell = self
            .scope
            .lookup_variable(name)
            .ok_or_else(|| RuntimeError::UndefinedName { name: name.clone() })?;

        if !cell.borrow().mutable {
            return Err(RuntimeError::AssignToImmutable { name: name.clone() });
        }

        match index {
            None => cell.borrow_mut().value = new_value,
            Some(index_expr) => {
                let index_value = self.eval_expr(index_expr)?;
                let list = match &cell.borrow().value {
                    Value::List(list) => list.clone(),
                    other => return Err(RuntimeError::NotAList { found: other.kind().display_name().to_owned() }),
                };
                let i = value_to_index(&index_value)?;
                let mut elements = list.borrow_mut();
                if i >= elements.len() {
                    return Err(RuntimeError::IndexOutOfBounds { index: i.to_string() });
                }
                elements[i] = new_value;
            }
        }
        Ok(Flow::Next)
    }

    fn exec_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: &[Stmt]) -> Result<Flow, RuntimeError> {
        let condition = self.eval_expr(cond)?;
        let branch = if require_boolean(&condition)? { then_branch } else { else_branch };
        self.in_child_scope(|me| me.exec_block(branch))
    }

    fn exec_switch(&mut self, cond: &Expr, cases: &[Case]) -> Result<Flow, RuntimeError> {
        let condition = self.eval_expr(cond)?;

        for case in cases.iter().filter(|c| c.value.is_some()) {
            let value_expr = case.value.as_ref().expect("filtered above");
            let outcome = self.in_child_scope(|me| {
                let case_value = me.eval_expr(value_expr)?;
                if case_value.structural_eq(&condition) {
                    Ok(Some(me.exec_block(&case.body)?))
                } else {
                    Ok(None)
                }
            })?;
            if let Some(flow) = outcome {
                return Ok(flow);
            }
        }

        let default_case = cases.iter().find(|c| c.value.is_none()).expect("analyzer guarantees a DEFAULT case");
        self.in_child_scope(|me| me.exec_block(&default_case.body))
    }

    fn exec_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<Flow, RuntimeError> {
        loop {
            let condition = self.eval_expr(cond)?;
            if !require_boolean(&condition)? {
                return Ok(Flow::Next);
            }
            match self.in_child_scope(|me| me.exec_block(body))? {
                Flow::Next => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
    }

    // ---- Expressions ----

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Group { inner, .. } => self.eval_expr(inner),
            Expr::Binary { op, left, right, .. } => self.eval_binary(op, left, right),
            Expr::Access { name, index, .. } => self.eval_access(name, index.as_deref()),
            Expr::Call { name, args, .. } => self.eval_call(name, args),
            Expr::List { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::list(values))
            }
        }
    }

    fn eval_access(&mut self, name: &str, index: Option<&Expr>) -> Result<Value, RuntimeError> {
        let cell = self
            .scope
            .lookup_variable(name)
            .ok_or_else(|| RuntimeError::UndefinedName { name: name.to_owned() })?;
        match index {
            None => Ok(cell.borrow().value.clone()),
            Some(index_expr) => {
                let index_value = self.eval_expr(index_expr)?;
                let i = value_to_index(&index_value)?;
                let borrowed = cell.borrow();
                match &borrowed.value {
                    Value::List(list) => list
                        .borrow()
                        .get(i)
                        .cloned()
                        .ok_or(RuntimeError::IndexOutOfBounds { index: i.to_string() }),
                    other => Err(RuntimeError::NotAList { found: other.kind().display_name().to_owned() }),
                }
            }
        }
    }

    fn eval_binary(&mut self, op: &str, left: &Expr, right: &Expr) -> Result<Value, RuntimeError> {
        match op {
            "&&" => {
                let l = require_boolean(&self.eval_expr(left)?)?;
                if !l {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(require_boolean(&self.eval_expr(right)?)?))
            }
            "||" => {
                let l = require_boolean(&self.eval_expr(left)?)?;
                if l {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(require_boolean(&self.eval_expr(right)?)?))
            }
            "==" | "!=" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let eq = l.structural_eq(&r);
                Ok(Value::Boolean(if op == "==" { eq } else { !eq }))
            }
            "<" | ">" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let ordering = l.partial_cmp_comparable(&r).ok_or_else(|| RuntimeError::KindMismatch {
                    left: l.kind().display_name().to_owned(),
                    right: r.kind().display_name().to_owned(),
                })?;
                Ok(Value::Boolean(if op == "<" { ordering.is_lt() } else { ordering.is_gt() }))
            }
            "+" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                    Ok(Value::String(format!("{l}{r}")))
                } else {
                    numeric_binary(&l, &r, |a, b| a + b, |a, b| a + b)
                }
            }
            "-" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                numeric_binary(&l, &r, |a, b| a - b, |a, b| a - b)
            }
            "*" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                numeric_binary(&l, &r, |a, b| a * b, |a, b| a * b)
            }
            "/" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                eval_division(&l, &r)
            }
            "^" => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                match (&l, &r) {
                    (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(integer_pow(a, b)?)),
                    _ => Err(RuntimeError::KindMismatch {
                        left: l.kind().display_name().to_owned(),
                        right: r.kind().display_name().to_owned(),
                    }),
                }
            }
            other => unreachable!("the analyzer rejects unknown operator '{other}' before this point"),
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }

        match (name, values.len()) {
            ("print", 1) => {
                writeln!(self.output, "{}", values[0]).map_err(|e| RuntimeError::Io(e.to_string()))?;
                Ok(Value::Nil)
            }
            ("logarithm", 1) => builtin_logarithm(&values[0]),
            ("converter", 2) => builtin_converter(&values[0], &values[1]),
            _ => {
                let function = self
                    .scope
                    .lookup_function(name, values.len())
                    .ok_or_else(|| RuntimeError::UndefinedFunction { name: name.to_owned() })?;
                self.call_function(&function, values)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Character(c) => Value::Character(*c),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Integer(i) => Value::Integer(i.clone()),
        Literal::Decimal(d) => Value::Decimal(d.clone()),
    }
}

fn require_boolean(value: &Value) -> Result<bool, RuntimeError> {
    value
        .as_boolean()
        .ok_or_else(|| RuntimeError::NotABoolean { found: value.kind().display_name().to_owned() })
}

fn value_to_index(value: &Value) -> Result<usize, RuntimeError> {
    match value {
        Value::Integer(i) => i
            .to_usize()
            .ok_or_else(|| RuntimeError::IndexOutOfBounds { index: i.to_string() }),
        other => Err(RuntimeError::NotAList { found: other.kind().display_name().to_owned() }),
    }
}

fn numeric_binary(
    left: &Value,
    right: &Value,
    int_op: impl Fn(&BigInt, &BigInt) -> BigInt,
    dec_op: impl Fn(&BigDecimal, &BigDecimal) -> BigDecimal,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(a, b))),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(dec_op(a, b))),
        _ => Err(RuntimeError::KindMismatch {
            left: left.kind().display_name().to_owned(),
            right: right.kind().display_name().to_owned(),
        }),
    }
}

fn eval_division(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Integer(a / b))
        }
        (Value::Decimal(a), Value::Decimal(b)) => {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            let scale = a.fractional_digit_count().max(b.fractional_digit_count()).max(0);
            Ok(Value::Decimal((a / b).with_scale_round(scale, RoundingMode::HalfEven)))
        }
        _ => Err(RuntimeError::KindMismatch {
            left: left.kind().display_name().to_owned(),
            right: right.kind().display_name().to_owned(),
        }),
    }
}

/// Correct `^` semantics, resolving Design Decision D2: repeated-squaring
/// exponentiation for the part of the exponent that fits in a `u32`, then
/// one extra multiply by `base` per unit beyond `u32::MAX` -- not the
/// original Java implementation's squaring bug.
fn integer_pow(base: &BigInt, exponent: &BigInt) -> Result<BigInt, RuntimeError> {
    if exponent.is_negative() {
        return Err(RuntimeError::NegativeExponent);
    }
    match exponent.to_u32() {
        Some(exp) => Ok(num_traits::pow::pow(base.clone(), exp as usize)),
        None => {
            let mut result = num_traits::pow::pow(base.clone(), u32::MAX as usize);
            let mut excess = exponent - BigInt::from(u32::MAX);
            while excess > BigInt::zero() {
                result *= base;
                excess -= BigInt::from(1);
            }
            Ok(result)
        }
    }
}

fn builtin_logarithm(value: &Value) -> Result<Value, RuntimeError> {
    let Value::Decimal(d) = value else {
        return Err(RuntimeError::KindMismatch {
            left: value.kind().display_name().to_owned(),
            right: Type::Decimal.display_name().to_owned(),
        });
    };
    let as_f64 = d.to_f64().unwrap_or(f64::NAN);
    let result = as_f64.ln();
    let result = BigDecimal::try_from(result).map_err(|_| RuntimeError::KindMismatch {
        left: "Decimal".to_owned(),
        right: "Decimal".to_owned(),
    })?;
    Ok(Value::Decimal(result))
}

fn builtin_converter(value: &Value, base: &Value) -> Result<Value, RuntimeError> {
    let (Value::Integer(n), Value::Integer(b)) = (value, base) else {
        return Err(RuntimeError::KindMismatch {
            left: value.kind().display_name().to_owned(),
            right: base.kind().display_name().to_owned(),
        });
    };
    let radix = b
        .to_u32()
        .filter(|r| (2..=36).contains(r))
        .ok_or_else(|| RuntimeError::InvalidRadix { base: b.to_string() })?;
    Ok(Value::String(n.to_str_radix(radix)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analyzer::analyze;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn run(source: &str) -> (Result<Value, RuntimeError>, String) {
        let tokens = scan(source);
        let ast = parse(&tokens).expect("source must parse");
        let program = analyze(ast).expect("source must analyze");
        let mut output = Vec::new();
        let result = Interpreter::with_output(&mut output).run(&program);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn minimal_program_returns_zero() {
        let (result, _) = run("FUN main(): Integer DO RETURN 0; END");
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(0)));
    }

    #[test]
    fn global_and_if() {
        let (result, _) = run(
            "VAL answer: Integer = 42; FUN main(): Integer DO IF answer == 42 DO RETURN 1; ELSE RETURN 0; END END",
        );
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(1)));
    }

    #[test]
    fn string_plus_integer_coerces_and_prints() {
        let (result, output) = run(r#"FUN main(): Integer DO print("x=" + 1); RETURN 0; END"#);
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(0)));
        assert_eq!(output, "x=1\n");
    }

    #[test]
    fn switch_with_default_picks_matching_case() {
        let (result, _) = run(
            "FUN main(): Integer DO LET x: Integer = 2; SWITCH x CASE 1: RETURN 10; CASE 2: RETURN 20; DEFAULT RETURN 30; END END",
        );
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(20)));
    }

    #[test]
    fn list_mutation_via_index_is_observable() {
        let (result, _) =
            run("LIST xs: Integer = [1,2,3]; FUN main(): Integer DO xs[1] = 9; RETURN xs[1]; END");
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(9)));
    }

    #[test]
    fn short_circuit_and_skips_right_operand_side_effects() {
        let (result, output) = run(
            r#"FUN sideEffect(): Boolean DO print("evaluated"); RETURN TRUE; END
               FUN main(): Integer DO
                 IF FALSE && sideEffect() DO RETURN 1; ELSE RETURN 0; END
               END"#,
        );
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(0)));
        assert_eq!(output, "");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (result, _) = run("FUN main(): Integer DO RETURN 1 / 0; END");
        assert!(matches!(result.unwrap_err(), RuntimeError::DivisionByZero));
    }

    #[test]
    fn assignment_to_immutable_global_is_a_runtime_error() {
        let (result, _) =
            run("VAL x: Integer = 1; FUN main(): Integer DO x = 2; RETURN x; END");
        assert!(matches!(result.unwrap_err(), RuntimeError::AssignToImmutable { .. }));
    }

    #[test]
    fn recursive_function_accumulates() {
        let (result, _) = run(
            "FUN sum(n: Integer): Integer DO
                IF n == 0 DO RETURN 0; END
                RETURN n + sum(n - 1);
             END
             FUN main(): Integer DO RETURN sum(5); END",
        );
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(15)));
    }

    #[test]
    fn while_loop_runs_until_condition_is_false() {
        let (result, _) = run(
            "FUN main(): Integer DO
                LET i: Integer = 0;
                WHILE i < 5 DO i = i + 1; END
                RETURN i;
             END",
        );
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(5)));
    }

    #[test]
    fn integer_power_matches_repeated_multiplication() {
        let (result, _) = run("FUN main(): Integer DO RETURN 2 ^ 10; END");
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(1024)));
    }

    #[test]
    fn converter_renders_digits_in_target_base() {
        let (result, output) = run(r#"FUN main(): Integer DO print(converter(255, 16)); RETURN 0; END"#);
        assert_eq!(result.unwrap(), Value::Integer(BigInt::from(0)));
        assert_eq!(output, "ff\n");
    }
}
