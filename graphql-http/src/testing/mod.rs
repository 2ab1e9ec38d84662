//! A small engine for tests.
//!
//! It understands documents made of flat selection sets:
//!
//! ```text
//! { hello echo }
//! query Named { hello }
//! mutation { doThing }
//! ```
//!
//! Root fields:
//!
//! | Type | Field | Resolves to |
//! |------|-------|-------------|
//! | Query | `hello` | the root value's greeting, or `"world"` |
//! | Query | `echo` | the `who` variable, or `null` |
//! | Query | `slowEcho` | `echo`, after yielding to the scheduler |
//! | Query | `viewer` | the context's user, or `null` |
//! | Query | `fail` | `null` plus a field error |
//! | Query | `boom` | a field error that nulls the whole result |
//! | Query | `panic` | panics |
//! | Mutation | `doThing` | `true` |
//! | Subscription | `ticks` | `1` |

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::engine::{ExecutionRequest, ExecutionResult, GraphQlEngine, OperationKind};
use crate::error::GraphQlError;

const QUERY_FIELDS: &[&str] = &["hello", "echo", "slowEcho", "viewer", "fail", "boom", "panic"];
const MUTATION_FIELDS: &[&str] = &["doThing"];
const SUBSCRIPTION_FIELDS: &[&str] = &["ticks"];

/// Root value understood by `hello`.
#[derive(Debug, Clone)]
pub struct TestRoot {
    pub greeting: String,
}

impl TestRoot {
    #[must_use]
    pub fn new(greeting: &str) -> Self {
        Self {
            greeting: greeting.to_owned(),
        }
    }
}

/// Context understood by `viewer`.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub user: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestEngine;

#[derive(Debug)]
pub struct TestDocument {
    pub operations: Vec<TestOperation>,
}

#[derive(Debug)]
pub struct TestOperation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub fields: Vec<TestField>,
}

#[derive(Debug)]
pub struct TestField {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Name(String),
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, GraphQlError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let (mut line, mut column) = (1, 1);

    while let Some(&c) = chars.peek() {
        let (start_line, start_column) = (line, column);
        if c == '\n' {
            chars.next();
            line += 1;
            column = 1;
        } else if c.is_whitespace() || c == ',' {
            chars.next();
            column += 1;
        } else if c == '#' {
            while chars.peek().is_some_and(|&c| c != '\n') {
                chars.next();
                column += 1;
            }
        } else if c == '{' || c == '}' {
            chars.next();
            column += 1;
            let kind = if c == '{' { TokenKind::Open } else { TokenKind::Close };
            tokens.push(Token {
                kind,
                line: start_line,
                column: start_column,
            });
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
                column += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Name(name),
                line: start_line,
                column: start_column,
            });
        } else {
            return Err(GraphQlError::new(format!("Syntax Error: Unexpected character \"{c}\"."))
                .with_location(start_line, start_column));
        }
    }

    tokens.push(Token {
        kind: TokenKind::End,
        line,
        column,
    });
    Ok(tokens)
}

fn unexpected(token: &Token) -> GraphQlError {
    let found = match &token.kind {
        TokenKind::Open => "\"{\"".to_owned(),
        TokenKind::Close => "\"}\"".to_owned(),
        TokenKind::Name(name) => format!("Name \"{name}\""),
        TokenKind::End => "<EOF>".to_owned(),
    };
    GraphQlError::new(format!("Syntax Error: Unexpected {found}."))
        .with_location(token.line, token.column)
}

fn parse_document(source: &str) -> Result<TestDocument, GraphQlError> {
    let tokens = tokenize(source)?;
    let mut position = 0;
    let mut operations = Vec::new();

    loop {
        let token = &tokens[position];
        let (kind, name) = match &token.kind {
            TokenKind::End if !operations.is_empty() => break,
            TokenKind::Open => (OperationKind::Query, None),
            TokenKind::Name(keyword) => {
                let kind = match keyword.as_str() {
                    "query" => OperationKind::Query,
                    "mutation" => OperationKind::Mutation,
                    "subscription" => OperationKind::Subscription,
                    _ => return Err(unexpected(token)),
                };
                position += 1;
                let name = match &tokens[position].kind {
                    TokenKind::Name(name) => {
                        position += 1;
                        Some(name.clone())
                    }
                    _ => None,
                };
                (kind, name)
            }
            _ => return Err(unexpected(token)),
        };

        if tokens[position].kind != TokenKind::Open {
            return Err(unexpected(&tokens[position]));
        }
        position += 1;

        let mut fields = Vec::new();
        loop {
            let token = &tokens[position];
            match &token.kind {
                TokenKind::Name(name) => fields.push(TestField {
                    name: name.clone(),
                    line: token.line,
                    column: token.column,
                }),
                TokenKind::Close if !fields.is_empty() => break,
                _ => return Err(unexpected(token)),
            }
            position += 1;
        }
        position += 1;

        operations.push(TestOperation { kind, name, fields });
    }

    Ok(TestDocument { operations })
}

impl TestDocument {
    fn select(&self, operation_name: Option<&str>) -> Result<&TestOperation, GraphQlError> {
        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| GraphQlError::new(format!("Unknown operation named \"{name}\"."))),
            None => match self.operations.as_slice() {
                [only] => Ok(only),
                _ => Err(GraphQlError::new(
                    "Must provide operation name if query contains multiple operations.",
                )),
            },
        }
    }
}

const fn root_type(kind: OperationKind) -> (&'static str, &'static [&'static str]) {
    match kind {
        OperationKind::Query => ("Query", QUERY_FIELDS),
        OperationKind::Mutation => ("Mutation", MUTATION_FIELDS),
        OperationKind::Subscription => ("Subscription", SUBSCRIPTION_FIELDS),
    }
}

fn echo(request: &ExecutionRequest<'_, TestDocument>) -> Value {
    request
        .variables
        .and_then(|variables| variables.get("who"))
        .cloned()
        .unwrap_or(Value::Null)
}

#[async_trait]
impl GraphQlEngine for TestEngine {
    type Document = TestDocument;

    fn parse(&self, source: &str) -> Result<TestDocument, GraphQlError> {
        parse_document(source)
    }

    fn validate(&self, document: &TestDocument) -> Vec<GraphQlError> {
        let mut errors = Vec::new();
        if document.operations.len() > 1 {
            errors.extend(
                document
                    .operations
                    .iter()
                    .filter(|op| op.name.is_none())
                    .map(|_| {
                        GraphQlError::new(
                            "This anonymous operation must be the only defined operation.",
                        )
                    }),
            );
        }
        for operation in &document.operations {
            let (type_name, known) = root_type(operation.kind);
            for field in &operation.fields {
                if !known.contains(&field.name.as_str()) {
                    errors.push(
                        GraphQlError::new(format!(
                            "Cannot query field \"{}\" on type \"{type_name}\".",
                            field.name
                        ))
                        .with_location(field.line, field.column),
                    );
                }
            }
        }
        errors
    }

    fn operation_kind(
        &self,
        document: &TestDocument,
        operation_name: Option<&str>,
    ) -> Option<OperationKind> {
        document.select(operation_name).ok().map(|op| op.kind)
    }

    async fn execute(
        &self,
        request: ExecutionRequest<'_, TestDocument>,
    ) -> Result<ExecutionResult, GraphQlError> {
        let operation = request.document.select(request.operation_name)?;
        let mut data = Map::new();
        let mut errors = Vec::new();

        for field in &operation.fields {
            let value = match field.name.as_str() {
                "hello" => {
                    let greeting = request
                        .root_value
                        .and_then(|root| root.downcast_ref::<TestRoot>())
                        .map_or("world", |root| root.greeting.as_str());
                    Value::String(greeting.to_owned())
                }
                "echo" => echo(&request),
                "slowEcho" => {
                    tokio::task::yield_now().await;
                    echo(&request)
                }
                "viewer" => request
                    .context
                    .and_then(|context| context.downcast_ref::<TestContext>())
                    .map_or(Value::Null, |context| Value::String(context.user.clone())),
                "fail" => {
                    errors.push(
                        GraphQlError::new("Field failure.")
                            .with_location(field.line, field.column)
                            .with_path(vec![field.name.as_str().into()]),
                    );
                    Value::Null
                }
                "boom" => {
                    errors.push(
                        GraphQlError::new("Non-null field failed.")
                            .with_location(field.line, field.column)
                            .with_path(vec![field.name.as_str().into()]),
                    );
                    return Ok(ExecutionResult::new(Value::Null).with_errors(errors));
                }
                "panic" => panic!("resolver panicked"),
                "doThing" => Value::Bool(true),
                "ticks" => Value::from(1),
                other => {
                    return Err(GraphQlError::new(format!("No resolver for \"{other}\".")));
                }
            };
            data.insert(field.name.clone(), value);
        }

        Ok(ExecutionResult::new(Value::Object(data)).with_errors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operations() {
        let document = parse_document("query A { hello, echo }\nmutation B { doThing }").expect("parses");
        assert_eq!(document.operations.len(), 2);
        assert_eq!(document.operations[0].kind, OperationKind::Query);
        assert_eq!(document.operations[0].name.as_deref(), Some("A"));
        assert_eq!(document.operations[0].fields.len(), 2);
        assert_eq!(document.operations[1].kind, OperationKind::Mutation);
        assert_eq!(document.operations[1].fields[0].line, 2);
    }

    #[test]
    fn test_parse_errors_have_locations() {
        let err = parse_document("{ hello").expect_err("unterminated");
        assert_eq!(err.message, "Syntax Error: Unexpected <EOF>.");
        assert_eq!(err.locations[0].line, 1);
        assert_eq!(err.locations[0].column, 8);

        let err = parse_document("{ he$llo }").expect_err("bad character");
        assert_eq!(err.message, "Syntax Error: Unexpected character \"$\".");
        assert_eq!(err.locations[0].column, 5);

        let err = parse_document("").expect_err("empty");
        assert_eq!(err.message, "Syntax Error: Unexpected <EOF>.");
    }
}
