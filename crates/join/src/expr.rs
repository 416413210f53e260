use {
    core::fmt::{self, Display},
    std::collections::HashSet,
};

/// Left-side expression of an equi condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Column(String),
    Literal(String),
    Call { function: String, args: Vec<Expr> },
}

impl Expr {
    // Names of the columns this expression reads.
    pub fn required_bindings(&self) -> HashSet<&str> {
        let mut bindings = HashSet::new();
        self.collect_bindings(&mut bindings);
        bindings
    }

    fn collect_bindings<'a>(&'a self, bindings: &mut HashSet<&'a str>) {
        match self {
            Self::Column(name) => {
                bindings.insert(name.as_str());
            }
            Self::Literal(_) => {}
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_bindings(bindings);
                }
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Literal(value) => write!(f, "'{value}'"),
            Self::Call { function, args } => {
                write!(f, "{function}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
