use indoc::{formatdoc, indoc};

use crate::{Endpoint, HttpHeader, HttpMethod};

pub(crate) const HTTP_RESPONSE: &str = indoc! {r#"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    #if( $ctx.result.statusCode == 200 || $ctx.result.statusCode == 201 )
      #if( $util.defaultIfNull($ctx.result.headers.get("Content-Type"), "").toLowerCase().contains("xml") )
        $util.xml.toJsonString($ctx.result.body)
      #else
        $ctx.result.body
      #end
    #else
      $util.error($ctx.result.body, "$ctx.result.statusCode")
    #end
"#};

fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

pub(crate) fn http_request(
    method: HttpMethod,
    endpoint: &Endpoint,
    headers: &[HttpHeader],
    arguments: &[String],
) -> String {
    let mut request = String::from("#set( $headers = {} )\n");
    request.push_str("$util.qr($headers.put(\"Content-Type\", \"application/json\"))\n");
    for header in headers {
        request.push_str(&format!("$util.qr($headers.put({}, {}))\n", quoted(&header.key), quoted(&header.value)));
    }

    request.push_str("#set( $query = {} )\n");
    for (key, value) in &endpoint.query {
        request.push_str(&format!("$util.qr($query.put({}, {}))\n", quoted(key), quoted(value)));
    }

    let body = if method.sends_body() {
        request.push_str("#set( $body = {} )\n");
        "\n    \"body\": $util.toJson($body),"
    } else {
        ""
    };
    let target = if method.sends_body() { "$body" } else { "$query" };
    for argument in arguments {
        request.push_str(&format!(
            "#if( !$util.isNull($ctx.args.{argument}) )\n  \
             $util.qr({target}.put(\"{argument}\", $ctx.args.{argument}))\n\
             #end\n"
        ));
    }

    request.push_str(&formatdoc! {r#"
        {{
          "version": "2018-05-29",
          "method": "{method}",
          "resourcePath": "{path}",
          "params": {{{body}
            "query": $util.toJson($query),
            "headers": $util.toJson($headers)
          }}
        }}
    "#, path = endpoint.resource_path()});
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_requests_send_arguments_as_query() {
        let endpoint = Endpoint::parse("https://api.example.com/posts/:id").unwrap();
        let request = http_request(HttpMethod::Get, &endpoint, &[], &["lang".to_owned()]);

        insta::assert_snapshot!(request.trim_end(), @r###"
        #set( $headers = {} )
        $util.qr($headers.put("Content-Type", "application/json"))
        #set( $query = {} )
        #if( !$util.isNull($ctx.args.lang) )
          $util.qr($query.put("lang", $ctx.args.lang))
        #end
        {
          "version": "2018-05-29",
          "method": "GET",
          "resourcePath": "/posts/${ctx.args.params.id}",
          "params": {
            "query": $util.toJson($query),
            "headers": $util.toJson($headers)
          }
        }
        "###);
    }

    #[test]
    fn post_requests_send_a_body() {
        let endpoint = Endpoint::parse("https://api.example.com/posts").unwrap();
        let headers = [HttpHeader {
            key: "x-api-key".to_owned(),
            value: "secret".to_owned(),
        }];
        let request = http_request(HttpMethod::Post, &endpoint, &headers, &["title".to_owned()]);

        assert!(request.contains("$util.qr($headers.put(\"x-api-key\", \"secret\"))"));
        assert!(request.contains("$util.qr($body.put(\"title\", $ctx.args.title))"));
        assert!(request.contains("\"body\": $util.toJson($body),"));
        assert!(request.contains("\"method\": \"POST\""));
    }
}
