//! Auth slot templates.
//!
//! Every role allowed an operation gets a block guarded by the request's auth type. Roles that are
//! decided by the record itself (owners and dynamic groups) cannot be checked before the data load
//! for reads and updates, so they contribute a filter or a condition to the stash instead, which
//! the data-load templates apply.

use graphql_transformer_core::access_control::ModelOperation;
use indoc::{formatdoc, indoc};

use crate::rules::{AuthProvider, RoleDefinition, RoleKind};

const NO_CLAIM: &str = "___xamznone____";

pub(crate) const AUTH_RESPONSE: &str = "$util.toJson({})\n";

/// A role allowed to perform the operation, with the input fields it may not write.
pub(crate) struct AllowedRole<'a> {
    pub role: &'a RoleDefinition,
    pub denied_fields: Vec<&'a str>,
}

/// `$ownerClaim` read from the identity. `sub::username` style claims join several claims.
fn claim_lines(variable: &str, claim: &str) -> String {
    let parts: Vec<_> = claim.split("::").collect();
    if let [single] = parts.as_slice() {
        return format!("#set( ${variable} = {} )\n", claim_expression(single));
    }

    let mut lines = String::new();
    for (index, part) in parts.iter().enumerate() {
        lines.push_str(&format!("#set( ${variable}{index} = {} )\n", claim_expression(part)));
    }
    let joined = (0..parts.len())
        .map(|index| format!("${variable}{index}"))
        .collect::<Vec<_>>()
        .join("::");
    lines.push_str(&format!("#set( ${variable} = \"{joined}\" )\n"));
    lines
}

fn claim_expression(claim: &str) -> String {
    match claim {
        "username" => format!(
            "$util.defaultIfNull($ctx.identity.claims.get(\"username\"), $util.defaultIfNull($ctx.identity.claims.get(\"cognito:username\"), \"{NO_CLAIM}\"))"
        ),
        claim => format!("$util.defaultIfNull($ctx.identity.claims.get(\"{claim}\"), \"{NO_CLAIM}\")"),
    }
}

/// Grant the request, unless the input touches a field the role may not write.
fn grant(denied_fields: &[&str]) -> String {
    if denied_fields.is_empty() {
        return "#set( $isAuthorized = true )\n".to_owned();
    }

    let fields = denied_fields
        .iter()
        .map(|field| format!("\"{field}\""))
        .collect::<Vec<_>>()
        .join(", ");
    formatdoc! {r#"
        #set( $deniedFields = [{fields}] )
        #if( $util.list.copyAndRetainAll($ctx.args.input.keySet(), $deniedFields).isEmpty() )
          #set( $isAuthorized = true )
        #end
    "#}
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {line}\n")).collect()
}

fn role_block(allowed: &AllowedRole<'_>, operation: ModelOperation) -> String {
    let role = allowed.role;
    let grant = grant(&allowed.denied_fields);

    let body = match &role.kind {
        RoleKind::Public | RoleKind::Custom => grant,
        RoleKind::Private => match role.provider {
            AuthProvider::Iam => formatdoc! {r#"
                #if( $ctx.identity.cognitoIdentityAuthType == "authenticated" )
                {grant}#end
            "#, grant = indent(&grant)},
            _ => grant,
        },
        RoleKind::StaticGroup { group, claim } => formatdoc! {r#"
            #set( $groupClaim = $util.defaultIfNull($ctx.identity.claims.get("{claim}"), []) )
            #if( $groupClaim.contains("{group}") )
            {grant}#end
        "#, grant = indent(&grant)},
        RoleKind::Owner { field, claim } => {
            let mut body = claim_lines("ownerClaim", claim);
            body.push_str(&record_check(field, "$ownerClaim", false, operation, &grant));
            body
        }
        RoleKind::DynamicGroup { field, claim } => {
            let mut body =
                format!("#set( $groupClaim = $util.defaultIfNull($ctx.identity.claims.get(\"{claim}\"), []) )\n");
            body.push_str(&record_check(field, "$groupClaim", true, operation, &grant));
            body
        }
    };

    formatdoc! {r#"
        ## {name}
        #if( $util.authType() == "{auth_type}" )
        {body}#end
    "#, name = role.name, auth_type = role.provider.auth_type_name(), body = indent(&body)}
}

/// Checks of owner and dynamic group roles against the record or the arguments.
fn record_check(field: &str, claim: &str, is_group: bool, operation: ModelOperation, grant: &str) -> String {
    match operation {
        ModelOperation::Create if is_group => formatdoc! {r#"
            #set( $recordGroups = $util.defaultIfNull($ctx.args.input.get("{field}"), []) )
            #foreach( $group in {claim} )
              #if( $recordGroups.contains($group) )
            {grant}  #end
            #end
        "#, grant = indent(&indent(grant))},
        ModelOperation::Create => formatdoc! {r#"
            #set( $ownerValue = $ctx.args.input.get("{field}") )
            #if( $util.isNull($ownerValue) )
              $util.qr($ctx.args.input.put("{field}", {claim}))
            {grant}#elseif( $ownerValue == {claim} )
            {grant}#end
        "#, grant = indent(grant)},
        ModelOperation::Update | ModelOperation::Delete => record_predicate("$authConditions", field, claim, is_group),
        ModelOperation::Listen if is_group => formatdoc! {r#"
            #if( {claim}.contains($ctx.args.{field}) )
            {grant}#end
        "#, grant = indent(grant)},
        ModelOperation::Listen => formatdoc! {r#"
            #if( $ctx.args.{field} == {claim} )
            {grant}#end
        "#, grant = indent(grant)},
        ModelOperation::Get | ModelOperation::List | ModelOperation::Sync | ModelOperation::Search => {
            record_predicate("$authFilter", field, claim, is_group)
        }
    }
}

/// Add a predicate on the record's `field` to `list`: equality for owners, membership for groups.
fn record_predicate(list: &str, field: &str, claim: &str, is_group: bool) -> String {
    if is_group {
        formatdoc! {r#"
            #foreach( $group in {claim} )
              $util.qr({list}.add({{ "{field}": {{ "contains": $group }} }}))
            #end
        "#}
    } else {
        format!("$util.qr({list}.add({{ \"{field}\": {{ \"eq\": {claim} }} }}))\n")
    }
}

/// The `auth` slot template guarding `operation` for the given roles.
pub(crate) fn auth_request(roles: &[AllowedRole<'_>], operation: ModelOperation) -> String {
    let mut request = String::from(indoc! {r#"
        ## [Start] Authorization Steps. **
        $util.qr($ctx.stash.put("hasAuth", true))
        #set( $isAuthorized = false )
        #set( $authFilter = [] )
        #set( $authConditions = [] )
    "#});

    for allowed in roles {
        request.push_str(&role_block(allowed, operation));
    }

    request.push_str(indoc! {r#"
        #if( !$isAuthorized && !$authFilter.isEmpty() )
          $util.qr($ctx.stash.put("authFilter", { "or": $authFilter }))
          #set( $isAuthorized = true )
        #end
        #if( !$isAuthorized && !$authConditions.isEmpty() )
          $util.qr($ctx.stash.put("authCondition", { "or": $authConditions }))
          #set( $isAuthorized = true )
        #end
        #if( !$isAuthorized )
          $util.unauthorized()
        #end
        $util.toJson({})
        ## [End] Authorization Steps. **
    "#});
    request
}
