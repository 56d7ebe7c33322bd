//! Lexical nesting estimate, taken before the input reaches the parser.
//!
//! The parser, the tree walk and the printer all recurse, so a deeply nested
//! input can exhaust the stack before any diagnostic is produced. This scan
//! walks the token stream without building a tree and returns an upper bound
//! on the depth of the tree the parser would build:
//!
//! - every open bracket counts one level
//! - inside each bracket, every operator, keyword and call or index opener
//!   counts one level until a `,`, a `;` or an automatically inserted
//!   semicolon ends the current expression
//!
//! String, template, comment and regular-expression contents are skipped, so
//! bracket characters inside literals never count. Where `/` cannot be told
//! apart from a regular expression without a parser (after `}`, `yield`,
//! `await` or `of`) and at `<!--`, the scan stops and charges every remaining
//! byte as one level.

/// Depth figures for one source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NestingDepth {
    /// Deepest nesting of `(`, `[`, `{` and template `${`.
    pub brackets: usize,
    /// Upper bound on the depth of the syntax tree.
    pub syntax: usize,
}

/// Measure `code`.
pub fn measure(code: &str) -> NestingDepth {
    Scanner::new(code).run()
}

/// Words that can never be identifiers; a `/` after them starts a regex.
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "switch", "throw", "try", "typeof", "var", "void", "while",
    "with",
];

/// Reserved words that evaluate to a value.
const OPERAND_WORDS: &[&str] = &["this", "null", "true", "false", "super"];

/// Keywords in some grammars and identifiers in others.
const CONTEXTUAL_WORDS: &[&str] = &["yield", "await", "of"];

/// Words that continue the statement before them.
const CONTINUATION_WORDS: &[&str] = &[
    "else", "while", "catch", "finally", "in", "instanceof", "of",
];

/// Keywords followed by a parenthesized statement head.
const HEAD_WORDS: &[&str] = &["if", "for", "while", "with"];

/// Multi-character punctuators, longest first. `/` and `/=` are handled apart.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "%=", "&=", "|=",
    "^=", "**", "<<", ">>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Paren,
    /// `(` after `if`, `for`, `while` or `with`.
    HeadParen,
    Bracket,
    Brace,
    /// `${` inside a template literal.
    Interpolation,
}

/// What the previous token means for a following `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    /// Start of input, operator, opener or separator: `/` starts a regex.
    ExprStart,
    /// End of an operand: `/` divides.
    Operand,
    /// `)` closing a statement head: `/` starts a regex.
    HeadEnd,
    /// `}` closing a block or a literal: ambiguous.
    BraceEnd,
    /// `yield`, `await` or `of`: ambiguous.
    Contextual,
}

/// Deferred end-of-statement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Semicolon,
    BraceEnd,
}

/// How the next token relates to the statement before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    /// Identifier, keyword, string or number.
    Starts,
    /// `else`, `while`, `catch`, `finally`, `in`, `instanceof`, `of`.
    Continues,
    /// Operator, bracket or template.
    Other,
}

enum TemplateEnd {
    Closed,
    Interpolation,
}

struct Scanner<'s> {
    src: &'s str,
    pos: usize,
    frames: Vec<Frame>,
    /// One chain length per frame plus the top level.
    chains: Vec<usize>,
    /// Open frames plus every chain length.
    total: usize,
    prev: Prev,
    pending: Pending,
    newline: bool,
    line_start: bool,
    property_next: bool,
    head_next: bool,
    depth: NestingDepth,
}

impl<'s> Scanner<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            frames: Vec::new(),
            chains: vec![0],
            total: 0,
            prev: Prev::ExprStart,
            pending: Pending::None,
            newline: false,
            line_start: true,
            property_next: false,
            head_next: false,
            depth: NestingDepth::default(),
        }
    }

    fn run(mut self) -> NestingDepth {
        if self.rest().starts_with("#!") {
            self.skip_line();
        }
        loop {
            self.skip_trivia();
            let Some(c) = self.peek() else { break };
            match c {
                '"' | '\'' => {
                    self.begin(Lead::Starts);
                    self.bump();
                    self.skip_string(c);
                    self.prev = Prev::Operand;
                }
                '`' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.count();
                    self.continue_template();
                }
                '/' => {
                    match self.prev {
                        Prev::Operand => {
                            self.begin(Lead::Other);
                            self.bump();
                            if self.peek() == Some('=') {
                                self.bump();
                            }
                            self.count();
                            self.prev = Prev::ExprStart;
                        }
                        Prev::ExprStart | Prev::HeadEnd => {
                            self.begin(Lead::Other);
                            self.bump();
                            self.skip_regex();
                            self.prev = Prev::Operand;
                        }
                        Prev::BraceEnd | Prev::Contextual => {
                            self.bail();
                            break;
                        }
                    }
                }
                '(' | '[' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.count();
                    let frame = match c {
                        '[' => Frame::Bracket,
                        _ if self.head_next => Frame::HeadParen,
                        _ => Frame::Paren,
                    };
                    self.push(frame);
                    self.prev = Prev::ExprStart;
                }
                '{' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.push(Frame::Brace);
                    self.prev = Prev::ExprStart;
                }
                ')' | ']' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.prev = match self.pop() {
                        Some(Frame::HeadParen) => Prev::HeadEnd,
                        _ => Prev::Operand,
                    };
                }
                '}' => {
                    self.begin(Lead::Other);
                    self.bump();
                    if self.frames.last() == Some(&Frame::Interpolation) {
                        self.pop();
                        self.continue_template();
                    } else {
                        self.pop();
                        self.prev = Prev::BraceEnd;
                        self.pending = Pending::BraceEnd;
                    }
                }
                ';' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.prev = Prev::ExprStart;
                    self.pending = Pending::Semicolon;
                }
                ',' => {
                    self.begin(Lead::Other);
                    self.bump();
                    self.reset_chain();
                    self.prev = Prev::ExprStart;
                }
                '<' if self.rest().starts_with("<!--") => {
                    self.bail();
                    break;
                }
                c if c.is_ascii_digit() => {
                    self.begin(Lead::Starts);
                    self.skip_number();
                    self.prev = Prev::Operand;
                }
                '.' if self.nth_is_digit(1) => {
                    self.begin(Lead::Starts);
                    self.skip_number();
                    self.prev = Prev::Operand;
                }
                c if is_word_start(c) => {
                    // Words manage `head_next` themselves.
                    self.word();
                    continue;
                }
                _ => self.punctuator(),
            }
            self.head_next = false;
        }
        self.depth
    }

    /// Handle one identifier, keyword or property name.
    fn word(&mut self) {
        let src = self.src;
        let start = self.pos;
        self.skip_word();
        let word = &src[start..self.pos];

        if std::mem::take(&mut self.property_next) {
            self.begin(Lead::Other);
            self.prev = Prev::Operand;
            self.head_next = false;
            return;
        }

        let lead = if CONTINUATION_WORDS.contains(&word) {
            Lead::Continues
        } else {
            Lead::Starts
        };
        self.begin(lead);

        let for_await = word == "await" && self.head_next;
        if OPERAND_WORDS.contains(&word) {
            self.prev = Prev::Operand;
        } else if CONTEXTUAL_WORDS.contains(&word) {
            self.count();
            self.prev = Prev::Contextual;
        } else if RESERVED_WORDS.contains(&word) {
            self.count();
            self.prev = Prev::ExprStart;
        } else {
            self.prev = Prev::Operand;
        }

        // `for await (` keeps the head open.
        self.head_next = for_await || HEAD_WORDS.contains(&word);
    }

    fn punctuator(&mut self) {
        let src = self.src;
        let postfix_allowed = self.prev == Prev::Operand && !self.newline;
        self.begin(Lead::Other);

        let len = PUNCTUATORS
            .iter()
            .find(|p| self.rest().starts_with(**p))
            .map(|p| p.len());
        let op = match len {
            // `?.5` is a conditional followed by a number.
            Some(2) if self.rest().starts_with("?.") && self.nth_is_digit(2) => "?",
            Some(n) => &src[self.pos..self.pos + n],
            None => {
                let c = self.peek().map_or(0, char::len_utf8);
                &src[self.pos..self.pos + c]
            }
        };
        self.pos += op.len();
        self.count();

        self.prev = match op {
            "++" | "--" if postfix_allowed => Prev::Operand,
            _ => Prev::ExprStart,
        };
        if op == "." || op == "?." {
            self.property_next = true;
        }
    }

    /// Apply deferred and newline statement boundaries before a token.
    fn begin(&mut self, lead: Lead) {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Semicolon if lead != Lead::Continues => self.reset_chain(),
            Pending::BraceEnd if lead == Lead::Starts => self.reset_chain(),
            _ => {
                if self.newline && self.prev == Prev::Operand && lead == Lead::Starts {
                    self.reset_chain();
                }
            }
        }
        self.property_next = false;
        self.newline = false;
        self.line_start = false;
    }

    fn count(&mut self) {
        if let Some(chain) = self.chains.last_mut() {
            *chain += 1;
        }
        self.total += 1;
        self.depth.syntax = self.depth.syntax.max(self.total);
    }

    fn reset_chain(&mut self) {
        if let Some(chain) = self.chains.last_mut() {
            self.total -= std::mem::take(chain);
        }
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.chains.push(0);
        self.total += 1;
        self.depth.brackets = self.depth.brackets.max(self.frames.len());
        self.depth.syntax = self.depth.syntax.max(self.total);
    }

    fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        let chain = self.chains.pop().unwrap_or(0);
        self.total -= chain + 1;
        Some(frame)
    }

    /// Charge every remaining byte as one level of nesting.
    fn bail(&mut self) {
        let remaining = self.src.len() - self.pos;
        self.depth.syntax = self.depth.syntax.max(self.total + remaining);
        self.pos = self.src.len();
    }

    fn rest(&self) -> &'s str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn nth_is_digit(&self, n: usize) -> bool {
        self.rest().chars().nth(n).is_some_and(|c| c.is_ascii_digit())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                self.bump();
                self.newline = true;
                self.line_start = true;
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.bump();
            } else if self.rest().starts_with("//") {
                self.skip_line();
            } else if self.rest().starts_with("/*") {
                self.pos += 2;
                match self.rest().find("*/") {
                    Some(end) => {
                        let body = &self.rest()[..end];
                        if body.chars().any(is_line_terminator) {
                            self.newline = true;
                            self.line_start = true;
                        }
                        self.pos += end + 2;
                    }
                    None => self.pos = self.src.len(),
                }
            } else if self.line_start && self.rest().starts_with("-->") {
                self.skip_line();
            } else {
                return;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                return;
            }
            self.bump();
        }
    }

    fn skip_string(&mut self, quote: char) {
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                '\n' | '\r' => return,
                c if c == quote => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_regex(&mut self) {
        let mut in_class = false;
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                return;
            }
            self.bump();
            match c {
                '\\' => {
                    if self.peek().is_some_and(|n| !is_line_terminator(n)) {
                        self.bump();
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        while self.peek().is_some_and(is_word_part) {
            self.bump();
        }
    }

    fn skip_number(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            self.bump();
        }
    }

    fn skip_word(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                if self.peek() == Some('u') {
                    self.bump();
                    if self.peek() == Some('{') {
                        while let Some(c) = self.bump() {
                            if c == '}' {
                                break;
                            }
                        }
                    }
                }
            } else if is_word_part(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Scan template text up to its closing backtick or the next `${`.
    fn continue_template(&mut self) {
        match self.template_text() {
            TemplateEnd::Closed => self.prev = Prev::Operand,
            TemplateEnd::Interpolation => {
                self.push(Frame::Interpolation);
                self.prev = Prev::ExprStart;
            }
        }
    }

    fn template_text(&mut self) -> TemplateEnd {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '`' => return TemplateEnd::Closed,
                '$' if self.peek() == Some('{') => {
                    self.bump();
                    return TemplateEnd::Interpolation;
                }
                _ => {}
            }
        }
        TemplateEnd::Closed
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, '_' | '$' | '\\' | '#')
        || (!c.is_ascii() && !c.is_whitespace() && c != '\u{feff}')
}

fn is_word_part(c: char) -> bool {
    (is_word_start(c) && c != '\\') || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brackets(code: &str) -> usize {
        measure(code).brackets
    }

    fn syntax(code: &str) -> usize {
        measure(code).syntax
    }

    #[test]
    fn counts_real_brackets() {
        assert_eq!(brackets("f(g(h(1)));"), 3);
        assert_eq!(brackets("if (a) { x = [1, [2]]; }"), 3);
        assert_eq!(brackets(""), 0);
    }

    #[test]
    fn ignores_brackets_in_strings_and_comments() {
        let open = "(".repeat(300);
        assert_eq!(brackets(&format!("const s = \"{open}\";")), 0);
        assert_eq!(brackets(&format!("const s = '{open}';")), 0);
        assert_eq!(brackets(&format!("// {open}\nx;")), 0);
        assert_eq!(brackets(&format!("/* {open} */ x;")), 0);
        assert_eq!(brackets(&format!("const s = \"\\\"{open}\";")), 0);
    }

    #[test]
    fn ignores_brackets_in_templates_but_counts_interpolations() {
        let open = "[".repeat(300);
        assert_eq!(brackets(&format!("const t = `{open}`;")), 0);
        assert_eq!(brackets("const t = `a ${ f(x) } b`;"), 2);
        assert_eq!(brackets("const t = `a ${ `b ${ c } d` } e`;"), 2);
    }

    #[test]
    fn ignores_brackets_in_regex_literals() {
        assert_eq!(brackets("const r = /[(((]/g;"), 0);
        assert_eq!(brackets("if (s) /\\(\\(/.test(s);"), 1);
        assert_eq!(brackets("x = a / (b / c);"), 1);
    }

    #[test]
    fn prefix_operator_chains_count() {
        let code = format!("{}x;", "!".repeat(500));
        assert!(syntax(&code) >= 500);
    }

    #[test]
    fn assignment_chains_count() {
        let code = format!("{}1;", "a = ".repeat(400));
        assert!(syntax(&code) >= 400);
    }

    #[test]
    fn nested_statement_heads_count() {
        let code = format!("{}x;", "if (a) ".repeat(300));
        assert!(syntax(&code) >= 300);

        let code = format!("{}x;", "if (a)\n".repeat(300));
        assert!(syntax(&code) >= 300, "newlines after a statement head do not end it");
    }

    #[test]
    fn else_if_chains_survive_semicolons() {
        let code = format!("if (a) x;{}", " else if (a) x;".repeat(300));
        assert!(syntax(&code) >= 300);
    }

    #[test]
    fn statements_reset_the_chain() {
        let code = "a = b + c;\n".repeat(1000);
        assert!(syntax(&code) < 10, "got {}", syntax(&code));

        let code = "a = b + c\n".repeat(1000);
        assert!(syntax(&code) < 10, "semicolon-free lines end statements");
    }

    #[test]
    fn commas_reset_the_chain() {
        let items: Vec<String> = (0..1000).map(|i| format!("a + {i}")).collect();
        let code = format!("f({});", items.join(", "));
        assert!(syntax(&code) < 10, "got {}", syntax(&code));
    }

    #[test]
    fn ambiguous_slash_charges_the_rest() {
        let tail = "!".repeat(100);
        let code = format!("{{}} / {tail} x /;");
        assert!(syntax(&code) >= 100);
    }

    #[test]
    fn html_open_comment_charges_the_rest() {
        let code = format!("a <!-- b + {}x", "!".repeat(200));
        assert!(syntax(&code) >= 200);
    }

    #[test]
    fn property_names_are_not_keywords() {
        assert_eq!(brackets("x.if(a) / f(g(1)) / 2;"), 2);
        assert!(syntax("x.if(a) / 2;") < 10);
    }
}
