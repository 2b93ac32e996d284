//! Utility toolkit — current time and a small arithmetic calculator.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use crate::schema::{MethodDecl, ParamDecl};
use crate::tools::{Arguments, Toolkit};

pub struct UtilityToolkit;

impl UtilityToolkit {
    pub fn new() -> Self {
        Self
    }

    fn current_time(&self) -> Value {
        let now = Local::now();
        json!({
            "date": now.format("%A, %B %d, %Y").to_string(),
            "time": now.format("%I:%M:%S %p").to_string(),
        })
    }

    fn calculate(&self, equation: &str) -> Result<Value> {
        let result = eval_expression(equation)
            .with_context(|| format!("Invalid equation: {}", equation))?;
        Ok(json!({ "equation": equation, "result": result }))
    }
}

impl Default for UtilityToolkit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolkit for UtilityToolkit {
    fn name(&self) -> &str {
        "utility"
    }

    fn methods(&self) -> Vec<MethodDecl> {
        vec![
            MethodDecl::new(
                "get_current_time",
                "Get the current date and time in a human-readable format.",
                vec![],
            ),
            MethodDecl::new(
                "calculator",
                "Calculate the result of an arithmetic equation.",
                vec![ParamDecl::required(
                    "equation",
                    "String",
                    "The equation to calculate, e.g. '2 * (3 + 4)'",
                )],
            ),
        ]
    }

    async fn invoke(&self, method: &str, args: &Arguments) -> Result<Value> {
        match method {
            "get_current_time" => Ok(self.current_time()),
            "calculator" => {
                let equation = args
                    .get("equation")
                    .and_then(Value::as_str)
                    .context("Missing 'equation' argument")?;
                self.calculate(equation)
            }
            other => bail!("Unknown method: {}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// Expression evaluator: + - * / with parentheses and unary minus.
// ---------------------------------------------------------------------------

fn eval_expression(input: &str) -> Result<f64> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        bail!("unexpected character at position {}", parser.pos);
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn consume(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            if self.consume('+') {
                value += self.term()?;
            } else if self.consume('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.factor()?;
        loop {
            if self.consume('*') {
                value *= self.factor()?;
            } else if self.consume('/') {
                let divisor = self.factor()?;
                if divisor == 0.0 {
                    bail!("division by zero");
                }
                value /= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    fn factor(&mut self) -> Result<f64> {
        self.skip_whitespace();
        if self.consume('-') {
            return Ok(-self.factor()?);
        }
        if self.consume('(') {
            let value = self.expression()?;
            if !self.consume(')') {
                bail!("missing closing parenthesis");
            }
            return Ok(value);
        }
        self.number()
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            bail!("expected a number at position {}", start);
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("malformed number '{}'", literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_basic_arithmetic() {
        assert_eq!(eval_expression("2 + 3").unwrap(), 5.0);
        assert_eq!(eval_expression("2 * (3 + 4)").unwrap(), 14.0);
        assert_eq!(eval_expression("10 / 4").unwrap(), 2.5);
        assert_eq!(eval_expression("-3 + 5").unwrap(), 2.0);
        assert_eq!(eval_expression("2 - -2").unwrap(), 4.0);
    }

    #[test]
    fn respects_precedence() {
        assert_eq!(eval_expression("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(eval_expression("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(eval_expression("2 +").is_err());
        assert!(eval_expression("(1 + 2").is_err());
        assert!(eval_expression("1 / 0").is_err());
        assert!(eval_expression("two plus two").is_err());
        assert!(eval_expression("1 2").is_err());
    }

    #[tokio::test]
    async fn calculator_method_returns_the_result() {
        let kit = UtilityToolkit::new();
        let mut args = Arguments::new();
        args.insert("equation".into(), json!("6 * 7"));
        let value = kit.invoke("calculator", &args).await.unwrap();
        assert_eq!(value["result"], 42.0);
    }

    #[tokio::test]
    async fn current_time_is_well_formed() {
        let kit = UtilityToolkit::new();
        let value = kit.invoke("get_current_time", &Arguments::new()).await.unwrap();
        assert!(value["date"].as_str().unwrap().contains(','));
        assert!(value["time"].as_str().is_some());
    }
}
