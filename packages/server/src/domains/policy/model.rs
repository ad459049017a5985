//! Embedded policy model.
//!
//! Requests are `(subject, resource, action)`. A rule matches when the
//! request subject is the rule subject or holds the rule subject as a role
//! (transitively through `g` assignments). Any matching `allow` grants access
//! unless a matching `deny` exists; with no match the answer is deny.

use casbin::DefaultModel;

const MODEL_CONF: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act, eft

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

pub fn model_conf() -> &'static str {
    MODEL_CONF
}

/// Parse the embedded model
pub async fn policy_model() -> casbin::Result<DefaultModel> {
    DefaultModel::from_str(MODEL_CONF).await
}
