use std::rc::Rc;

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::ast::{Block, Expression, Program, Statement};
use crate::environment::{Environment, EnvironmentRef};
use crate::object::{native_bool, BuiltinFn, Value, FALSE, NULL, TRUE};

/*
Structural recursion over the AST: every node variant maps to exactly one match arm.
Nothing here ever panics or returns a host `Result` — a failure at any point becomes an
ordinary `Value::Error`, which every caller checks for before using an operand. This
keeps every match in this module exhaustive and keeps the "never throws" contract of the
spec visible in the types: `evaluate` always returns a `Value`, period.
*/

pub static BUILTINS: Lazy<HashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, BuiltinFn> = HashMap::new();
    m.insert("longitud", builtin_longitud);
    m
});

fn builtin_longitud(arguments: &[Value]) -> Value {
    if arguments.len() != 1 {
        return Value::Error(format!(
            "número incorrecto de argumentos para longitud: se recibieron {}, se requiere 1",
            arguments.len()
        ));
    }

    match &arguments[0] {
        Value::String(s) => Value::Integer(s.chars().count() as i64),
        other => Value::Error(format!(
            "argumento para longitud no soportado, se recibió {}",
            other.value_type()
        )),
    }
}

pub fn evaluate(program: &Program, env: &EnvironmentRef) -> Value {
    eval_program(&program.statements, env)
}

fn eval_program(statements: &[Statement], env: &EnvironmentRef) -> Value {
    let mut result = NULL.clone();

    for statement in statements {
        result = eval_statement(statement, env);

        match result {
            Value::Return(inner) => return *inner,
            Value::Error(_) => return result,
            _ => {}
        }
    }

    result
}

/// Unlike `eval_program`, a `Return` here is **not** unwrapped — it has to keep
/// propagating through every enclosing block until it reaches the function boundary
/// that should actually stop at it.
fn eval_block(block: &Block, env: &EnvironmentRef) -> Value {
    let mut result = NULL.clone();

    for statement in &block.statements {
        result = eval_statement(statement, env);

        if matches!(result, Value::Return(_) | Value::Error(_)) {
            return result;
        }
    }

    result
}

fn eval_statement(statement: &Statement, env: &EnvironmentRef) -> Value {
    match statement {
        Statement::Let { name, value, .. } => {
            let value = evaluate_expression(value, env);
            if value.is_error() {
                return value;
            }
            env.borrow_mut().set(name.value.clone(), value);
            NULL.clone()
        }
        Statement::Return { return_value, .. } => {
            let value = evaluate_expression(return_value, env);
            if value.is_error() {
                return value;
            }
            Value::Return(Box::new(value))
        }
        Statement::Expression { expression, .. } => evaluate_expression(expression, env),
    }
}

fn evaluate_expression(expression: &Expression, env: &EnvironmentRef) -> Value {
    match expression {
        Expression::Integer { value, .. } => Value::Integer(*value),
        Expression::Boolean { value, .. } => native_bool(*value),
        Expression::StringLiteral { value, .. } => Value::String(Rc::from(value.as_str())),
        Expression::Identifier(identifier) => eval_identifier(&identifier.value, env),
        Expression::Prefix { operator, right, .. } => {
            let right = evaluate_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix_expression(operator, right)
        }
        Expression::Infix {
            left,
            operator,
            right,
            ..
        } => {
            let left = evaluate_expression(left, env);
            if left.is_error() {
                return left;
            }
            let right = evaluate_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix_expression(operator, left, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
            ..
        } => eval_if_expression(condition, consequence, alternative.as_ref(), env),
        Expression::Function {
            parameters, body, ..
        } => Value::Function {
            parameters: Rc::new(parameters.clone()),
            body: Rc::new(body.clone()),
            env: Rc::clone(env),
        },
        Expression::Call {
            function,
            arguments,
            ..
        } => eval_call_expression(function, arguments, env),
    }
}

fn eval_identifier(name: &str, env: &EnvironmentRef) -> Value {
    if let Some(value) = env.borrow().get(name) {
        return value;
    }
    if let Some(builtin) = BUILTINS.get(name) {
        return Value::Builtin(*builtin);
    }
    Value::Error(format!("identificador no encontrado: {}", name))
}

fn eval_prefix_expression(operator: &str, right: Value) -> Value {
    match operator {
        "!" => native_bool(!right.is_truthy()),
        "-" => match right {
            Value::Integer(n) => match n.checked_neg() {
                Some(negated) => Value::Integer(negated),
                None => Value::Error("desbordamiento aritmético: -INTEGER".to_string()),
            },
            other => Value::Error(format!("operador desconocido: -{}", other.value_type())),
        },
        other => Value::Error(format!(
            "operador desconocido: {}{}",
            other,
            right.value_type()
        )),
    }
}

fn eval_infix_expression(operator: &str, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix_expression(operator, *l, *r),
        (Value::Boolean(_), Value::Boolean(_)) => {
            eval_boolean_infix_expression(operator, &left, &right)
        }
        (Value::String(l), Value::String(r)) => eval_string_infix_expression(operator, l, r),
        (l, r) if l.value_type() != r.value_type() => Value::Error(format!(
            "tipo de dato incompatible: {} {} {}",
            l.value_type(),
            operator,
            r.value_type()
        )),
        (l, r) => Value::Error(format!(
            "operador desconocido: {} {} {}",
            l.value_type(),
            operator,
            r.value_type()
        )),
    }
}

fn eval_integer_infix_expression(operator: &str, left: i64, right: i64) -> Value {
    match operator {
        "+" => checked_integer_op(left.checked_add(right), "+"),
        "-" => checked_integer_op(left.checked_sub(right), "-"),
        "*" => checked_integer_op(left.checked_mul(right), "*"),
        "/" => {
            if right == 0 {
                Value::Error("división por cero".to_string())
            } else {
                checked_integer_op(left.checked_div(right), "/")
            }
        }
        "<" => native_bool(left < right),
        ">" => native_bool(left > right),
        "<=" => native_bool(left <= right),
        ">=" => native_bool(left >= right),
        "==" | "===" => native_bool(left == right),
        "!=" | "!==" => native_bool(left != right),
        other => Value::Error(format!(
            "operador desconocido: INTEGER {} INTEGER",
            other
        )),
    }
}

/// `checked_add`/`checked_sub`/`checked_mul` return `None` on over/underflow instead of
/// panicking the way plain `+`/`-`/`*` do in debug builds; an overflowing result becomes
/// an ordinary `Value::Error` like every other evaluator failure mode.
fn checked_integer_op(result: Option<i64>, operator: &str) -> Value {
    match result {
        Some(value) => Value::Integer(value),
        None => Value::Error(format!("desbordamiento aritmético: INTEGER {} INTEGER", operator)),
    }
}

/// `TRUE`/`FALSE` are process-wide singletons, so this is equivalent to comparing by
/// identity the way the source language does, without needing an actual pointer
/// comparison in the implementation.
fn eval_boolean_infix_expression(operator: &str, left: &Value, right: &Value) -> Value {
    match operator {
        "==" | "===" => native_bool(left == right),
        "!=" | "!==" => native_bool(left != right),
        other => Value::Error(format!(
            "operador desconocido: BOOLEAN {} BOOLEAN",
            other
        )),
    }
}

fn eval_string_infix_expression(operator: &str, left: &str, right: &str) -> Value {
    match operator {
        "+" => Value::String(Rc::from(format!("{}{}", left, right))),
        "==" | "===" => native_bool(left == right),
        "!=" | "!==" => native_bool(left != right),
        other => Value::Error(format!("operador desconocido: STRING {} STRING", other)),
    }
}

fn eval_if_expression(
    condition: &Expression,
    consequence: &Block,
    alternative: Option<&Block>,
    env: &EnvironmentRef,
) -> Value {
    let condition = evaluate_expression(condition, env);
    if condition.is_error() {
        return condition;
    }

    if condition.is_truthy() {
        eval_block(consequence, env)
    } else if let Some(alternative) = alternative {
        eval_block(alternative, env)
    } else {
        NULL.clone()
    }
}

fn eval_call_expression(
    function: &Expression,
    arguments: &[Expression],
    env: &EnvironmentRef,
) -> Value {
    let function = evaluate_expression(function, env);
    if function.is_error() {
        return function;
    }

    let arguments = eval_expressions(arguments, env);
    if arguments.len() == 1 && arguments[0].is_error() {
        return arguments.into_iter().next().unwrap();
    }

    apply_function(function, arguments)
}

/// Mirrors the source evaluator's short-circuit: the moment one argument evaluates to
/// an error, every previously-evaluated argument is discarded and the result is a
/// single-element vector holding just that error, so the `arguments.len() == 1` check
/// above catches it regardless of which position it failed at.
fn eval_expressions(expressions: &[Expression], env: &EnvironmentRef) -> Vec<Value> {
    let mut result = Vec::with_capacity(expressions.len());

    for expression in expressions {
        let evaluated = evaluate_expression(expression, env);
        if evaluated.is_error() {
            return vec![evaluated];
        }
        result.push(evaluated);
    }

    result
}

fn apply_function(function: Value, arguments: Vec<Value>) -> Value {
    match function {
        Value::Function {
            parameters,
            body,
            env,
        } => {
            if parameters.len() != arguments.len() {
                return Value::Error(format!(
                    "número incorrecto de argumentos: se recibieron {}, se esperaban {}",
                    arguments.len(),
                    parameters.len()
                ));
            }

            let call_env = Environment::enclosed(&env);
            for (parameter, argument) in parameters.iter().zip(arguments) {
                call_env.borrow_mut().set(parameter.value.clone(), argument);
            }

            let evaluated = eval_block(&body, &call_env);
            match evaluated {
                Value::Return(inner) => *inner,
                other => other,
            }
        }
        Value::Builtin(builtin) => builtin(&arguments),
        other => Value::Error(format!("no es una función: {}", other.value_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval(source: &str) -> Value {
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer);
        let program = parser.parse_program();
        assert!(
            parser.errors.is_empty(),
            "unexpected parse errors: {:?}",
            parser.errors
        );
        let env = Environment::new();
        evaluate(&program, &env)
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("5 + 5 * 2;").inspect(), "15");
    }

    #[test]
    fn if_else_expression() {
        assert_eq!(
            eval("si (1 < 2) { verdadero } si_no { falso };").inspect(),
            "verdadero"
        );
    }

    #[test]
    fn function_call_with_return() {
        assert_eq!(
            eval("variable suma = funcion(a, b) { regresa a + b; }; suma(2, 3);").inspect(),
            "5"
        );
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("variable x = 5; -x;").inspect(), "-5");
    }

    #[test]
    fn builtin_longitud() {
        assert_eq!(eval(r#"longitud("hola");"#).inspect(), "4");
    }

    #[test]
    fn incompatible_types_produce_spanish_error() {
        assert_eq!(
            eval("5 + verdadero;").inspect(),
            "ERROR: tipo de dato incompatible: INTEGER + BOOLEAN"
        );
    }

    #[test]
    fn unknown_identifier_error() {
        assert_eq!(
            eval("foo;").inspect(),
            "ERROR: identificador no encontrado: foo"
        );
    }

    #[test]
    fn closures_capture_independent_invocations() {
        let lexer = Lexer::new(
            "variable add = funcion(x) { funcion(y) { x + y } }; \
             variable a2 = add(2); \
             a2(3);",
        );
        let mut parser = Parser::new(lexer);
        let program = parser.parse_program();
        assert!(parser.errors.is_empty());
        let env = Environment::new();
        assert_eq!(evaluate(&program, &env).inspect(), "5");

        // `a2` is still bound in `env`; calling it again must not have mutated the
        // closure's captured `x`.
        let lexer = Lexer::new("a2(4);");
        let mut parser = Parser::new(lexer);
        let program = parser.parse_program();
        assert!(parser.errors.is_empty());
        assert_eq!(evaluate(&program, &env).inspect(), "6");
    }

    #[test]
    fn nested_return_escapes_only_to_the_function_boundary() {
        let source = "variable f = funcion(x) { si (x > 0) { regresa 1; } regresa 0; }; f(5);";
        assert_eq!(eval(source).inspect(), "1");
        let source = "variable f = funcion(x) { si (x > 0) { regresa 1; } regresa 0; }; f(-5);";
        assert_eq!(eval(source).inspect(), "0");
    }

    #[test]
    fn let_with_error_value_does_not_bind() {
        assert_eq!(
            eval("variable x = foo; x;").inspect(),
            "ERROR: identificador no encontrado: foo"
        );
    }

    #[test]
    fn arity_mismatch_is_a_typed_error() {
        let source = "variable f = funcion(a, b) { a + b }; f(1);";
        assert_eq!(
            eval(source).inspect(),
            "ERROR: número incorrecto de argumentos: se recibieron 1, se esperaban 2"
        );
    }

    #[test]
    fn error_in_a_later_argument_still_short_circuits_the_call() {
        let source = "variable f = funcion(a, b) { a + b }; f(1, foo);";
        assert_eq!(
            eval(source).inspect(),
            "ERROR: identificador no encontrado: foo"
        );
    }

    #[test]
    fn calling_a_non_function_is_a_typed_error() {
        assert_eq!(
            eval("variable x = 5; x();").inspect(),
            "ERROR: no es una función: INTEGER"
        );
    }

    #[test]
    fn falsy_zero_and_empty_string() {
        assert_eq!(eval("si (0) { 1 } si_no { 2 };").inspect(), "2");
        assert_eq!(eval(r#"si ("") { 1 } si_no { 2 };"#).inspect(), "2");
    }

    #[test]
    fn division_by_zero_is_a_typed_error_not_a_panic() {
        assert_eq!(eval("10 / 0;").inspect(), "ERROR: división por cero");
    }

    #[test]
    fn minimum_integer_divided_by_negative_one_is_a_typed_error_not_a_panic() {
        assert_eq!(
            eval("(0 - 9223372036854775807 - 1) / (0 - 1);").inspect(),
            "ERROR: desbordamiento aritmético: INTEGER / INTEGER"
        );
    }

    #[test]
    fn integer_overflow_is_a_typed_error_not_a_panic() {
        assert_eq!(
            eval("9223372036854775807 + 1;").inspect(),
            "ERROR: desbordamiento aritmético: INTEGER + INTEGER"
        );
        assert_eq!(
            eval("-9223372036854775807 - 2;").inspect(),
            "ERROR: desbordamiento aritmético: INTEGER - INTEGER"
        );
        assert_eq!(
            eval("9223372036854775807 * 2;").inspect(),
            "ERROR: desbordamiento aritmético: INTEGER * INTEGER"
        );
    }

    #[test]
    fn negating_the_minimum_integer_is_a_typed_error_not_a_panic() {
        assert_eq!(
            eval("-(0 - 9223372036854775807 - 1);").inspect(),
            "ERROR: desbordamiento aritmético: -INTEGER"
        );
    }
}
