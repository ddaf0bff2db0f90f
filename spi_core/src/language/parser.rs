use std::cell::Cell;
use log::{debug, error, info};
use crate::language::token::{Token, TokenType};
use crate::language::ast::{AstNode, Number, Param, ProcedureDecl};
use crate::language::lexer::Lexer;
use crate::language::error::{Result, ErrorCode};
use crate::parser_error;

/// Deepest run of parentheses, unary signs, BEGIN blocks and nested
/// procedures the parser descends into.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Most operators stacked on one path from an expression's root to a leaf.
pub const MAX_EXPRESSION_DEPTH: usize = 512;

/// Recursive-descent parser with one token of lookahead.
///
/// Tokens are pulled from the lexer one at a time as the grammar consumes them.
/// Later passes walk the tree recursively, so nesting and expression depth are
/// capped here and reported as `NESTING_TOO_DEEP`.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    nesting: usize,
    /// Operator depth of the expression node built last.
    expr_depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            nesting: 0,
            expr_depth: 0,
        })
    }

    /// program : PROGRAM variable SEMI block DOT EOF
    pub fn parse(&mut self) -> Result<AstNode> {
        let node = self.program()?;
        self.expect_end()?;
        Ok(node)
    }

    /// Parses a lone expression that must span the whole input.
    pub fn parse_expression(&mut self) -> Result<AstNode> {
        let node = self.expr()?;
        self.expect_end()?;
        Ok(node)
    }

    fn expect_end(&self) -> Result<()> {
        if self.check(&TokenType::Eof) {
            Ok(())
        } else {
            self.unexpected("Expected end of input")
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        self.current_token.token_type.same_kind(token_type)
    }

    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current_token, next))
    }

    fn unexpected<T>(&self, expectation: &str) -> Result<T> {
        let token = &self.current_token;
        if token.token_type == TokenType::Eof {
            parser_error!(
                ErrorCode::UnexpectedEof,
                format!("{}, reached end of input", expectation),
                token
            )
        } else {
            parser_error!(
                ErrorCode::UnexpectedToken,
                format!("{}, found {} '{}'", expectation, token.token_type.kind_name(), token),
                token
            )
        }
    }

    /// Descends one level at the current token.
    fn nest(&mut self) -> Result<()> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return parser_error!(
                ErrorCode::NestingTooDeep,
                format!("Nesting exceeds {} levels", MAX_NESTING_DEPTH),
                &self.current_token
            );
        }
        self.nesting += 1;
        Ok(())
    }

    fn unnest(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    /// Depth of a new operator node over a child of depth `depth`.
    fn deepen(&self, depth: usize, op: &Token) -> Result<usize> {
        if depth >= MAX_EXPRESSION_DEPTH {
            return parser_error!(
                ErrorCode::NestingTooDeep,
                format!("Expression nests more than {} operators", MAX_EXPRESSION_DEPTH),
                op
            );
        }
        Ok(depth + 1)
    }

    /// Consumes the current token when it has the expected kind.
    ///
    /// On mismatch the error carries the position of the token that was found.
    fn eat(&mut self, expected: &TokenType) -> Result<Token> {
        if self.check(expected) {
            self.advance()
        } else {
            self.unexpected(&format!("Expected {}", expected.kind_name()))
        }
    }

    fn eat_id(&mut self) -> Result<(Token, String)> {
        let token = self.eat(&TokenType::Id(String::new()))?;
        let name = match &token.token_type {
            TokenType::Id(name) => name.clone(),
            _ => unreachable!("eat checked the token kind"),
        };
        Ok((token, name))
    }

    fn program(&mut self) -> Result<AstNode> {
        self.eat(&TokenType::Program)?;
        let (_, name) = self.eat_id()?;
        self.eat(&TokenType::Semi)?;
        let block = self.block()?;
        self.eat(&TokenType::Dot)?;

        Ok(AstNode::Program {
            name,
            block: Box::new(block),
            scope: Cell::new(None),
        })
    }

    /// block : declarations compound_statement
    fn block(&mut self) -> Result<AstNode> {
        let declarations = self.declarations()?;
        let compound_statement = self.compound_statement()?;

        Ok(AstNode::Block {
            declarations,
            compound_statement: Box::new(compound_statement),
        })
    }

    /// declarations : (VAR (variable_declaration SEMI)+)? procedure_declaration*
    ///
    /// A second VAR section is left for `compound_statement` to reject, so the
    /// error points at that VAR keyword.
    fn declarations(&mut self) -> Result<Vec<AstNode>> {
        let mut declarations = Vec::new();

        if self.check(&TokenType::Var) {
            self.advance()?;
            loop {
                declarations.extend(self.variable_declaration()?);
                self.eat(&TokenType::Semi)?;
                if !self.check(&TokenType::Id(String::new())) {
                    break;
                }
            }
        }

        while self.check(&TokenType::Procedure) {
            declarations.push(self.procedure_declaration()?);
        }

        Ok(declarations)
    }

    /// procedure_declaration : PROCEDURE ID (LPAREN formal_parameter_list RPAREN)? SEMI block SEMI
    fn procedure_declaration(&mut self) -> Result<AstNode> {
        self.nest()?;
        self.eat(&TokenType::Procedure)?;
        let (token, name) = self.eat_id()?;

        let mut params = Vec::new();
        if self.check(&TokenType::LParen) {
            self.advance()?;
            params = self.formal_parameter_list()?;
            self.eat(&TokenType::RParen)?;
        }

        self.eat(&TokenType::Semi)?;
        let block = self.block()?;
        self.eat(&TokenType::Semi)?;
        self.unnest();

        debug!("Parsed procedure '{}' with {} parameter(s)", name, params.len());
        Ok(AstNode::ProcedureDecl(ProcedureDecl {
            name,
            token,
            params,
            block: Box::new(block),
            symbol: Cell::new(None),
            scope: Cell::new(None),
        }))
    }

    /// formal_parameter_list : formal_parameters (SEMI formal_parameters)*
    fn formal_parameter_list(&mut self) -> Result<Vec<Param>> {
        let mut params = self.formal_parameters()?;

        while self.check(&TokenType::Semi) {
            self.advance()?;
            params.extend(self.formal_parameters()?);
        }

        Ok(params)
    }

    /// formal_parameters : ID (COMMA ID)* COLON type_spec
    fn formal_parameters(&mut self) -> Result<Vec<Param>> {
        let names = self.id_list()?;
        self.eat(&TokenType::Colon)?;
        let type_node = self.type_spec()?;

        Ok(names
            .into_iter()
            .map(|var_node| Param {
                var_node: Box::new(var_node),
                type_node: Box::new(type_node.clone()),
            })
            .collect())
    }

    /// variable_declaration : ID (COMMA ID)* COLON type_spec
    fn variable_declaration(&mut self) -> Result<Vec<AstNode>> {
        let names = self.id_list()?;
        self.eat(&TokenType::Colon)?;
        let type_node = self.type_spec()?;

        Ok(names
            .into_iter()
            .map(|var_node| AstNode::VarDecl {
                var_node: Box::new(var_node),
                type_node: Box::new(type_node.clone()),
            })
            .collect())
    }

    fn id_list(&mut self) -> Result<Vec<AstNode>> {
        let (token, name) = self.eat_id()?;
        let mut names = vec![AstNode::var(token, name)];

        while self.check(&TokenType::Comma) {
            self.advance()?;
            let (token, name) = self.eat_id()?;
            names.push(AstNode::var(token, name));
        }

        Ok(names)
    }

    /// type_spec : INTEGER | REAL
    fn type_spec(&mut self) -> Result<AstNode> {
        if self.check(&TokenType::Integer) || self.check(&TokenType::Real) {
            let token = self.advance()?;
            let name = token.value();
            Ok(AstNode::Type { token, name })
        } else {
            self.unexpected("Expected a type (INTEGER or REAL)")
        }
    }

    /// compound_statement : BEGIN statement_list END
    fn compound_statement(&mut self) -> Result<AstNode> {
        self.nest()?;
        self.eat(&TokenType::Begin)?;
        let statements = self.statement_list()?;
        self.eat(&TokenType::End)?;
        self.unnest();

        Ok(AstNode::Compound(statements))
    }

    /// statement_list : statement (SEMI statement)*
    fn statement_list(&mut self) -> Result<Vec<AstNode>> {
        let mut statements = vec![self.statement()?];

        while self.check(&TokenType::Semi) {
            self.advance()?;
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    /// statement : compound_statement | proccall_statement | assignment_statement | empty
    fn statement(&mut self) -> Result<AstNode> {
        if self.check(&TokenType::Begin) {
            self.compound_statement()
        } else if self.check(&TokenType::Id(String::new())) {
            let (token, name) = self.eat_id()?;
            if self.check(&TokenType::LParen) {
                self.proccall_statement(token, name)
            } else {
                self.assignment_statement(token, name)
            }
        } else {
            Ok(AstNode::NoOp)
        }
    }

    /// proccall_statement : ID LPAREN (expr (COMMA expr)*)? RPAREN
    fn proccall_statement(&mut self, token: Token, name: String) -> Result<AstNode> {
        self.eat(&TokenType::LParen)?;

        let mut args = Vec::new();
        if !self.check(&TokenType::RParen) {
            args.push(self.expr()?);
            while self.check(&TokenType::Comma) {
                self.advance()?;
                args.push(self.expr()?);
            }
        }

        self.eat(&TokenType::RParen)?;

        Ok(AstNode::ProcedureCall {
            name,
            token,
            args,
            symbol: Cell::new(None),
        })
    }

    /// assignment_statement : variable ASSIGN expr
    fn assignment_statement(&mut self, token: Token, name: String) -> Result<AstNode> {
        let left = AstNode::var(token, name);
        let op = self.eat(&TokenType::Assign)?;
        let right = self.expr()?;

        Ok(AstNode::Assign {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// expr : term ((PLUS | MINUS) term)*
    fn expr(&mut self) -> Result<AstNode> {
        let mut node = self.term()?;
        let mut depth = self.expr_depth;

        while self.check(&TokenType::Plus) || self.check(&TokenType::Minus) {
            let op = self.advance()?;
            let right = self.term()?;
            depth = self.deepen(depth.max(self.expr_depth), &op)?;

            node = AstNode::BinOp {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }

        self.expr_depth = depth;
        Ok(node)
    }

    /// term : factor ((MUL | INTEGER_DIV | FLOAT_DIV) factor)*
    fn term(&mut self) -> Result<AstNode> {
        let mut node = self.factor()?;
        let mut depth = self.expr_depth;

        while self.check(&TokenType::Mul)
            || self.check(&TokenType::IntegerDiv)
            || self.check(&TokenType::FloatDiv)
        {
            let op = self.advance()?;
            let right = self.factor()?;
            depth = self.deepen(depth.max(self.expr_depth), &op)?;

            node = AstNode::BinOp {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }

        self.expr_depth = depth;
        Ok(node)
    }

    /// factor : (PLUS | MINUS) factor | INTEGER_CONST | REAL_CONST | LPAREN expr RPAREN | variable
    fn factor(&mut self) -> Result<AstNode> {
        match &self.current_token.token_type {
            TokenType::Plus | TokenType::Minus => {
                self.nest()?;
                let op = self.advance()?;
                let expr = self.factor()?;
                self.unnest();
                self.expr_depth = self.deepen(self.expr_depth, &op)?;
                Ok(AstNode::UnaryOp { op, expr: Box::new(expr) })
            }
            TokenType::IntegerConst(value) => {
                let value = Number::Integer(*value);
                let token = self.advance()?;
                self.expr_depth = 0;
                Ok(AstNode::Num { token, value })
            }
            TokenType::RealConst(value) => {
                let value = Number::Real(*value);
                let token = self.advance()?;
                self.expr_depth = 0;
                Ok(AstNode::Num { token, value })
            }
            TokenType::LParen => {
                self.nest()?;
                self.advance()?;
                let node = self.expr()?;
                self.eat(&TokenType::RParen)?;
                self.unnest();
                Ok(node)
            }
            TokenType::Id(_) => {
                let (token, name) = self.eat_id()?;
                self.expr_depth = 0;
                Ok(AstNode::var(token, name))
            }
            _ => self.unexpected("Expected an expression"),
        }
    }
}

/// Lexes and parses a whole program.
pub fn parse(input: &str) -> Result<AstNode> {
    debug!("Parsing program source ({} bytes)", input.len());

    let mut parser = Parser::new(Lexer::new(input)).inspect_err(|e| error!("Parsing failed: {}", e))?;

    match parser.parse() {
        Ok(ast) => {
            info!("Parsing succeeded");
            Ok(ast)
        },
        Err(e) => {
            error!("Parsing failed: {}", e);
            Err(e)
        }
    }
}
