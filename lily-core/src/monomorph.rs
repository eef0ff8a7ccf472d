//! Instantiation of declarations and their dependency closure.
//!
//! [`Instantiator::instantiate`] binds generic arguments (checking arity
//! and constraints), records the signature, and, for a new signature,
//! walks every member type that names another generic declaration so
//! that its instance is registered with the same substitution.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::data_type::DataType;
use crate::decl::{DeclKind, DeclTable, PendingInstantiation};
use crate::diagnostic::Diagnostics;
use crate::error::SemaError;
use crate::generic::{CalledGenericParams, Substitution};
use crate::resolver::DataTypeResolver;
use crate::signature::AddSignature;
use crate::span::Span;
use crate::symbol::DeclId;

/// Signature cache counters.
#[derive(Debug, Default)]
pub struct MonomorphStats {
    created: AtomicU32,
    reused: AtomicU32,
    deferred: AtomicU32,
}

impl MonomorphStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, outcome: AddSignature) {
        let counter = match outcome {
            AddSignature::New(_) => &self.created,
            AddSignature::Existing(_) => &self.reused,
            AddSignature::Deferred => &self.deferred,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn reused(&self) -> u32 {
        self.reused.load(Ordering::Relaxed)
    }

    pub fn deferred(&self) -> u32 {
        self.deferred.load(Ordering::Relaxed)
    }

    /// Share of concrete requests answered by an existing signature, in
    /// percent. 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.reused();
        let total = hits + self.created();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// `Generic` leaves only; compiler placeholders are not owned by any
/// enclosing declaration.
pub fn mentions_generic_param(dt: &DataType) -> bool {
    let mut found = false;
    dt.visit(&mut |node| {
        if matches!(node, DataType::Generic(_)) {
            found = true;
        }
    });
    found
}

pub struct Instantiator<'a> {
    decls: &'a mut DeclTable,
    diagnostics: &'a mut Diagnostics,
    stats: &'a MonomorphStats,
    allow_implicit_cast: bool,
    max_depth: usize,
}

impl<'a> Instantiator<'a> {
    pub fn new(
        decls: &'a mut DeclTable,
        diagnostics: &'a mut Diagnostics,
        stats: &'a MonomorphStats,
        allow_implicit_cast: bool,
        max_depth: usize,
    ) -> Self {
        Instantiator {
            decls,
            diagnostics,
            stats,
            allow_implicit_cast,
            max_depth,
        }
    }

    /// Instantiates `id` with positional `args`.
    ///
    /// Errors of the dependency closure are reported as diagnostics; only
    /// the failure of this very request is returned.
    pub fn instantiate(
        &mut self,
        id: DeclId,
        args: Vec<DataType>,
        span: Span,
    ) -> Result<AddSignature, SemaError> {
        self.instantiate_at(id, args, span, 0)
    }

    fn instantiate_at(
        &mut self,
        id: DeclId,
        args: Vec<DataType>,
        span: Span,
        depth: usize,
    ) -> Result<AddSignature, SemaError> {
        let decl = self.decls.get(id);
        if depth > self.max_depth {
            return Err(SemaError::InstantiationDepthExceeded {
                name: decl.global_name.clone(),
                limit: self.max_depth,
            });
        }
        let global_name = decl.global_name.clone();
        let (subst, types) = {
            let resolver = DataTypeResolver::new(self.decls, self.allow_implicit_cast);
            let subst = Substitution::bind(
                &decl.name,
                &decl.generic_params,
                &CalledGenericParams::Positional(args),
                &resolver,
            )?;
            let types: Vec<DataType> = decl
                .signature_types(&subst)
                .iter()
                .map(|dt| resolver.normalize(dt))
                .collect();
            (subst, types)
        };

        let outcome = self.decls.get_mut(id).signatures.add_signature(
            &global_name,
            subst.as_map().clone(),
            types,
        )?;
        self.stats.record(outcome);
        if let AddSignature::New(_) = outcome {
            self.close_over(id, &subst, span, depth);
        }
        Ok(outcome)
    }

    /// Dependency closure of a freshly created signature.
    fn close_over(&mut self, id: DeclId, subst: &Substitution, span: Span, depth: usize) {
        let decl = self.decls.get(id);
        let mut requests: Vec<(DeclId, Vec<DataType>)> = Vec::new();

        let mut members: Vec<DataType> = decl
            .kind
            .member_types()
            .into_iter()
            .map(|dt| subst.apply(dt))
            .collect();
        if let DeclKind::Fun(fun) = &decl.kind {
            members.extend(fun.params.iter().map(|p| subst.apply(&p.data_type)));
            members.push(subst.apply(&fun.return_type));
        }
        for member in &members {
            member.visit(&mut |node| {
                let DataType::Custom(custom) = node else {
                    return;
                };
                let Some(target) = self.decls.by_global_name(&custom.name) else {
                    return;
                };
                let target_decl = self.decls.get(target);
                if target_decl.recursion_error || custom.generic_args.is_empty() {
                    return;
                }
                requests.push((target, custom.generic_args.clone()));
            });
        }

        // Methods without generics of their own follow their class.
        if let DeclKind::Class { methods, .. } = &decl.kind {
            let class_args: Vec<DataType> = decl
                .generic_params
                .iter()
                .filter_map(|p| subst.get(p.name()).cloned())
                .collect();
            for &method in methods {
                if self.decls.get(method).generic_params.len() == class_args.len() {
                    requests.push((method, class_args.clone()));
                }
            }
        }

        for pending in &decl.pending {
            let args = pending.generic_args.iter().map(|a| subst.apply(a)).collect();
            requests.push((pending.target, args));
        }

        for (target, args) in requests {
            if let Err(err) = self.instantiate_at(target, args, span, depth + 1) {
                self.diagnostics.report(err, span);
            }
        }
    }

    /// Records an instantiation requested inside the generic body of
    /// `owner` and replays it for every concrete signature `owner`
    /// already has. Later signatures replay it from [`Self::instantiate`].
    pub fn add_pending(&mut self, owner: DeclId, pending: PendingInstantiation) {
        tracing::debug!(
            owner = %self.decls.get(owner).global_name,
            target = %self.decls.get(pending.target).global_name,
            "pending instantiation"
        );
        let concrete: Vec<Substitution> = self
            .decls
            .get(owner)
            .signatures
            .iter()
            .filter(|sig| sig.has_only_known_types())
            .map(|sig| Substitution::from_map(sig.generic_params.clone()))
            .collect();
        self.decls.get_mut(owner).pending.push(pending.clone());
        for subst in concrete {
            let args = pending.generic_args.iter().map(|a| subst.apply(a)).collect();
            if let Err(err) = self.instantiate_at(pending.target, args, pending.span, 1) {
                self.diagnostics.report(err, pending.span);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Field, FunDecl, Param};
    use crate::generic::{GenericParam, GenericParams};
    use crate::scope::ScopeId;
    use crate::symbol::Visibility;

    fn generic_record(table: &mut DeclTable, name: &str, fields: Vec<(&str, DataType)>) -> DeclId {
        table.push(
            name,
            format!("main.{name}"),
            DeclKind::Record {
                fields: fields
                    .into_iter()
                    .map(|(n, dt)| Field {
                        name: n.to_string(),
                        data_type: dt,
                    })
                    .collect(),
            },
            smallvec::smallvec![GenericParam::normal("T")],
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        )
    }

    #[test]
    fn one_signature_per_distinct_tuple() {
        let mut decls = DeclTable::new();
        let pair = generic_record(
            &mut decls,
            "Pair",
            vec![("a", DataType::generic("T")), ("b", DataType::generic("T"))],
        );
        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        let mut inst = Instantiator::new(&mut decls, &mut diags, &stats, true, 64);

        let first = inst.instantiate(pair, vec![DataType::Int32], Span::dummy());
        let again = inst.instantiate(pair, vec![DataType::Int32], Span::dummy());
        let float = inst.instantiate(pair, vec![DataType::Float64], Span::dummy());
        assert_eq!(first, Ok(AddSignature::New(0)));
        assert_eq!(again, Ok(AddSignature::Existing(0)));
        assert_eq!(float, Ok(AddSignature::New(1)));
        assert_eq!(decls.get(pair).signatures.len(), 2);
        assert_eq!(stats.reused(), 1);
        assert_eq!(stats.created(), 2);
    }

    #[test]
    fn closure_instantiates_member_declarations() {
        let mut decls = DeclTable::new();
        let boxed = generic_record(&mut decls, "Boxed", vec![("value", DataType::generic("T"))]);
        let outer = generic_record(
            &mut decls,
            "Outer",
            vec![("inner", DataType::custom("main.Boxed", vec![DataType::generic("T")]))],
        );
        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        Instantiator::new(&mut decls, &mut diags, &stats, true, 64)
            .instantiate(outer, vec![DataType::Char], Span::dummy())
            .expect("outer");
        let sig = decls.get(boxed).signatures.get(0).expect("boxed signature");
        assert_eq!(sig.generic_params.get("T"), Some(&DataType::Char));
        assert!(diags.is_empty());
    }

    #[test]
    fn polymorphic_recursion_hits_the_depth_limit() {
        let mut decls = DeclTable::new();
        // Nest[T] { next: *Nest[[T]] } grows forever.
        let nest = generic_record(
            &mut decls,
            "Nest",
            vec![(
                "next",
                DataType::ptr(DataType::custom(
                    "main.Nest",
                    vec![DataType::list(DataType::generic("T"))],
                )),
            )],
        );
        decls.detect_recursive_types();
        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        Instantiator::new(&mut decls, &mut diags, &stats, true, 8)
            .instantiate(nest, vec![DataType::Int8], Span::dummy())
            .expect("first level");
        let exceeded: Vec<_> = diags
            .errors_matching(|e| matches!(e, SemaError::InstantiationDepthExceeded { .. }))
            .collect();
        assert_eq!(exceeded.len(), 1);
        assert_eq!(decls.get(nest).signatures.len(), 9);
    }

    #[test]
    fn pending_instantiations_replay_for_each_signature() {
        let mut decls = DeclTable::new();
        let boxed = generic_record(&mut decls, "Boxed", vec![("value", DataType::generic("T"))]);
        let wrap = decls.push(
            "wrap",
            "main.wrap".to_string(),
            DeclKind::Fun(FunDecl {
                params: vec![Param {
                    name: "x".to_string(),
                    data_type: DataType::generic("U"),
                    mutable: false,
                }],
                return_type: DataType::Unit,
                class: None,
            }),
            smallvec::smallvec![GenericParam::normal("U")],
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        );
        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        let mut inst = Instantiator::new(&mut decls, &mut diags, &stats, true, 64);
        inst.instantiate(wrap, vec![DataType::Bool], Span::dummy())
            .expect("bool");
        inst.add_pending(
            wrap,
            PendingInstantiation {
                target: boxed,
                generic_args: vec![DataType::generic("U")],
                span: Span::dummy(),
            },
        );
        inst.instantiate(wrap, vec![DataType::Str], Span::dummy())
            .expect("str");
        let args: Vec<_> = decls
            .get(boxed)
            .signatures
            .iter()
            .map(|sig| sig.generic_params["T"].clone())
            .collect();
        assert_eq!(args, vec![DataType::Bool, DataType::Str]);
        assert_eq!(
            decls.get(wrap).signatures.get(1).map(|s| s.types.clone()),
            Some(vec![DataType::Str, DataType::Unit])
        );
    }

    fn push_decl(decls: &mut DeclTable, name: &str, kind: DeclKind, params: GenericParams) -> DeclId {
        decls.push(
            name,
            format!("main.{name}"),
            kind,
            params,
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        )
    }

    fn class(decls: &mut DeclTable, name: &str, implements: Vec<DataType>) -> DeclId {
        push_decl(
            decls,
            name,
            DeclKind::Class {
                fields: Vec::new(),
                methods: Vec::new(),
                implements,
            },
            GenericParams::new(),
        )
    }

    fn constrained_fun(decls: &mut DeclTable, name: &str, constraint: DataType) -> DeclId {
        push_decl(
            decls,
            name,
            DeclKind::Fun(FunDecl {
                params: vec![Param {
                    name: "value".to_string(),
                    data_type: DataType::generic("T"),
                    mutable: false,
                }],
                return_type: DataType::Unit,
                class: None,
            }),
            smallvec::smallvec![GenericParam::constrained("T", vec![constraint])],
        )
    }

    #[test]
    fn trait_constraint_is_met_through_implements() {
        let mut decls = DeclTable::new();
        push_decl(
            &mut decls,
            "Speaker",
            DeclKind::Trait {
                prototypes: Vec::new(),
            },
            GenericParams::new(),
        );
        let speaker = DataType::custom("main.Speaker", vec![]);
        class(&mut decls, "Dog", vec![speaker.clone()]);
        class(&mut decls, "Cat", Vec::new());
        let speak = constrained_fun(&mut decls, "speak", speaker.clone());

        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        let mut inst = Instantiator::new(&mut decls, &mut diags, &stats, true, 64);

        let dog = inst.instantiate(speak, vec![DataType::custom("main.Dog", vec![])], Span::dummy());
        assert_eq!(dog, Ok(AddSignature::New(0)));
        let cat = inst.instantiate(speak, vec![DataType::custom("main.Cat", vec![])], Span::dummy());
        assert_eq!(
            cat,
            Err(SemaError::ConstraintViolation {
                param: "T".to_string(),
                data_type: DataType::custom("main.Cat", vec![]),
                constraint: speaker.clone(),
            })
        );
        let int = inst.instantiate(speak, vec![DataType::Int32], Span::dummy());
        assert!(matches!(int, Err(SemaError::ConstraintViolation { .. })));
        assert_eq!(decls.get(speak).signatures.len(), 1);
    }

    #[test]
    fn primitive_constraint_accepts_implicit_widening() {
        let mut decls = DeclTable::new();
        let widen = constrained_fun(&mut decls, "widen", DataType::Int64);
        let mut diags = Diagnostics::new();
        let stats = MonomorphStats::new();
        let mut inst = Instantiator::new(&mut decls, &mut diags, &stats, true, 64);

        assert!(inst.instantiate(widen, vec![DataType::Int8], Span::dummy()).is_ok());
        assert!(inst.instantiate(widen, vec![DataType::Int64], Span::dummy()).is_ok());
        assert!(matches!(
            inst.instantiate(widen, vec![DataType::Float64], Span::dummy()),
            Err(SemaError::ConstraintViolation { .. })
        ));
    }
}
