//! Lowered sketch representation
//!
//! Extracted statement text is lowered once per start into these closed
//! enums. Anything the sketch dialect does not recognise survives as
//! [`StmtKind::Ignored`] or [`Expr::Arithmetic`], which keeps the lowering
//! total: no source text can make it fail.

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A statement sequence, shared between the sketch and running frames
pub type Block = Rc<[Stmt]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Delay(Expr),
    DelayMicros(Expr),
    SerialBegin,
    SerialPrint {
        arg: PrintArg,
        newline: bool,
    },
    SerialPrintf {
        format: String,
        args: Vec<Expr>,
    },
    PinMode {
        pin: Expr,
        mode: Expr,
    },
    DigitalWrite {
        pin: Expr,
        value: Expr,
    },
    /// `analogWrite`, and the `ledcWrite`, `tone` and `noTone` forms lowered
    /// onto it
    AnalogWrite {
        pin: Expr,
        duty: Expr,
    },
    Assign {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    /// `name++` / `name--`
    Step {
        name: String,
        delta: f64,
    },
    If(Rc<IfChain>),
    For(Rc<ForLoop>),
    While(Rc<WhileLoop>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// Text with no recognised form; executing it does nothing
    Ignored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrintArg {
    /// A string or char literal, escapes already expanded
    Literal(String),
    Value(Expr),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfChain {
    pub branches: Vec<(Cond, Block)>,
    pub otherwise: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub init: Option<Stmt>,
    pub cond: Cond,
    pub step: Option<Stmt>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub cond: Cond,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Map,
    Constrain,
    Random,
    Abs,
    Sqrt,
    Min,
    Max,
    Pow,
    IsNan,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "map" => Some(Builtin::Map),
            "constrain" => Some(Builtin::Constrain),
            "random" => Some(Builtin::Random),
            "abs" => Some(Builtin::Abs),
            "sqrt" => Some(Builtin::Sqrt),
            "min" => Some(Builtin::Min),
            "max" => Some(Builtin::Max),
            "pow" => Some(Builtin::Pow),
            "isnan" => Some(Builtin::IsNan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Millis,
    Micros,
    DigitalRead(Box<Expr>),
    AnalogRead(Box<Expr>),
    Builtin { func: Builtin, args: Vec<Expr> },
    Variable(String),
    /// Left for the guarded arithmetic evaluator at run time
    Arithmetic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Ge,
    Le,
    Ne,
    Eq,
    Gt,
    Lt,
}

impl CmpOp {
    /// Operators in the order a condition is searched for them
    pub const SEARCH_ORDER: [(CmpOp, &'static str); 6] = [
        (CmpOp::Ge, ">="),
        (CmpOp::Le, "<="),
        (CmpOp::Ne, "!="),
        (CmpOp::Eq, "=="),
        (CmpOp::Gt, ">"),
        (CmpOp::Lt, "<"),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    All(Vec<Cond>),
    Any(Vec<Cond>),
    Not(Box<Cond>),
    Compare { lhs: Expr, op: CmpOp, rhs: Expr },
    Truthy(Expr),
}

/// A user-defined function
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    pub location: SourceLocation,
}
