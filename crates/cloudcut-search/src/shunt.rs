//! Infix → postfix conversion (shunting-yard).

#[cfg(test)]
use crate::lexer::Op;
use crate::lexer::Token;

/// Convert a token stream to a postfix program.
///
/// Standard shunting-yard over the operator precedence table; parentheses
/// group. Malformed input is not rejected here: a stray parenthesis flows
/// into the output and the evaluator's arity and end-of-stack checks turn
/// the whole query into a non-match.
pub fn shunt(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Term(_) => output.push(token),
            Token::LParen => stack.push(token),
            Token::RParen => {
                while let Some(top) = stack.pop() {
                    if matches!(top, Token::LParen) {
                        break;
                    }
                    output.push(top);
                }
            }
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    if let Some(popped) = stack.pop() {
                        output.push(popped);
                    }
                }
                stack.push(Token::Op(op));
            }
        }
    }

    while let Some(token) = stack.pop() {
        output.push(token);
    }

    output
}
