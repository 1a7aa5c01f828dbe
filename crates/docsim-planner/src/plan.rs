//! Query plan tree.

use std::collections::BTreeSet;
use std::fmt;

use docsim_operators::{AggregateParams, FilterParams, JoinParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryPlan {
    Scan {
        collection: String,
    },
    Filter {
        input: Box<QueryPlan>,
        params: FilterParams,
    },
    Join {
        left: Box<QueryPlan>,
        right: Box<QueryPlan>,
        params: JoinParams,
    },
    Aggregate {
        input: Box<QueryPlan>,
        params: AggregateParams,
    },
}

impl QueryPlan {
    pub fn scan(collection: impl Into<String>) -> Self {
        QueryPlan::Scan {
            collection: collection.into(),
        }
    }

    pub fn filter(self, params: FilterParams) -> Self {
        QueryPlan::Filter {
            input: Box::new(self),
            params,
        }
    }

    /// `self` becomes the left input.
    pub fn join(self, right: QueryPlan, params: JoinParams) -> Self {
        QueryPlan::Join {
            left: Box::new(self),
            right: Box::new(right),
            params,
        }
    }

    pub fn aggregate(self, params: AggregateParams) -> Self {
        QueryPlan::Aggregate {
            input: Box::new(self),
            params,
        }
    }

    /// Collections scanned anywhere in the tree.
    pub fn collections(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_scans(&mut out);
        out
    }

    fn collect_scans<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            QueryPlan::Scan { collection } => {
                out.insert(collection.as_str());
            }
            QueryPlan::Filter { input, .. } | QueryPlan::Aggregate { input, .. } => {
                input.collect_scans(out)
            }
            QueryPlan::Join { left, right, .. } => {
                left.collect_scans(out);
                right.collect_scans(out);
            }
        }
    }

    /// Number of operators, scans excluded.
    pub fn operator_count(&self) -> usize {
        match self {
            QueryPlan::Scan { .. } => 0,
            QueryPlan::Filter { input, .. } | QueryPlan::Aggregate { input, .. } => {
                1 + input.operator_count()
            }
            QueryPlan::Join { left, right, .. } => {
                1 + left.operator_count() + right.operator_count()
            }
        }
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPlan::Scan { collection } => write!(f, "{collection}"),
            QueryPlan::Filter { input, params } => {
                write!(f, "filter({input}, [{}], {})", params.fields.join(", "), params.selectivity)
            }
            QueryPlan::Join { left, right, params } => {
                write!(f, "join({left}, {right}, {})", params.key)
            }
            QueryPlan::Aggregate { input, params } => {
                write!(f, "aggregate({input}, [{}])", params.group_by.join(", "))
            }
        }
    }
}
