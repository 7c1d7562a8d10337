use calc_domain::Operation;
use thiserror::Error;

use super::ast::{ExprNode, ExprTree, NodeId};

/// 解析失败原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("表达式为空")]
    Empty,
    #[error("位置 {position} 出现意外字符 '{ch}'")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("括号不匹配")]
    UnbalancedParenthesis,
    #[error("缺少操作数")]
    MissingOperand,
    #[error("无效的数字: {0}")]
    InvalidNumber(String),
    #[error("相邻的项之间缺少运算符")]
    MissingOperator,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Operator(Operation),
    LeftParen,
    RightParen,
}

/// 把表达式文本解析为运算树
pub fn parse(input: &str) -> Result<ExprTree, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        tokens,
        position: 0,
        nodes: Vec::new(),
    };
    let root = parser.parse_expr()?;

    // 此处还有剩余 token 说明两个项之间缺少运算符（如 "1 2"），
    // 或者出现了多余的右括号
    match parser.peek() {
        None => Ok(ExprTree::new(parser.nodes, root)),
        Some(Token::RightParen) => Err(ParseError::UnbalancedParenthesis),
        Some(_) => Err(ParseError::MissingOperator),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => {
                i += 1;
            }
            '+' => {
                tokens.push(Token::Operator(Operation::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Operator(Operation::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Operator(Operation::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Operator(Operation::Div));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    i += 1;
                    let fraction_start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i == fraction_start {
                        let text: String = chars[start..i].iter().collect();
                        return Err(ParseError::InvalidNumber(text));
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(text))?;
                tokens.push(Token::Number(value));
            }
            _ => {
                return Err(ParseError::UnexpectedCharacter { ch, position: i });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    nodes: Vec<ExprNode>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn push(&mut self, node: ExprNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn push_op(&mut self, operation: Operation, left: NodeId, right: NodeId) -> NodeId {
        self.push(ExprNode::Op {
            operation,
            left,
            right,
            task_scheduled: false,
        })
    }

    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_term()?;
        while let Some(Token::Operator(op @ (Operation::Add | Operation::Sub))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = self.push_op(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_factor()?;
        while let Some(Token::Operator(op @ (Operation::Mul | Operation::Div))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = self.push_op(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<NodeId, ParseError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(self.push(ExprNode::Leaf { value })),
            Some(Token::LeftParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    _ => Err(ParseError::UnbalancedParenthesis),
                }
            }
            Some(Token::Operator(_)) | Some(Token::RightParen) | None => {
                Err(ParseError::MissingOperand)
            }
        }
    }
}
