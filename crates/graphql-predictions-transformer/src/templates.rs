//! Request and response templates, one pair per action. Every action after the first reads its
//! text from `$ctx.prev.result` unless the input gives one.

use indoc::{formatdoc, indoc};

use crate::actions::PredictionsAction;

const ERROR_CHECK: &str = indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
"};

fn input(action: PredictionsAction) -> String {
    format!("$ctx.args.input.{action}")
}

fn rekognition_request(action: PredictionsAction, bucket: &str, target: &str) -> String {
    formatdoc! {r#"
        #set( $actionInput = {input} )
        {{
          "version": "2018-05-29",
          "method": "POST",
          "resourcePath": "/",
          "params": {{
            "body": {{
              "Image": {{
                "S3Object": {{
                  "Bucket": "{bucket}",
                  "Name": "public/$actionInput.key"
                }}
              }}
            }},
            "headers": {{
              "Content-Type": "application/x-amz-json-1.1",
              "X-Amz-Target": "{target}"
            }}
          }}
        }}
    "#, input = input(action)}
}

pub(crate) fn request(action: PredictionsAction, bucket: &str, chained: bool) -> String {
    let text = if chained {
        format!("$util.defaultIfNull({}.text, $ctx.prev.result)", input(action))
    } else {
        format!("{}.text", input(action))
    };

    match action {
        PredictionsAction::IdentifyText => rekognition_request(action, bucket, "RekognitionService.DetectText"),
        PredictionsAction::IdentifyLabels => rekognition_request(action, bucket, "RekognitionService.DetectLabels"),
        PredictionsAction::TranslateText => formatdoc! {r#"
            #set( $actionInput = {input} )
            #set( $text = {text} )
            {{
              "version": "2018-05-29",
              "method": "POST",
              "resourcePath": "/",
              "params": {{
                "body": {{
                  "SourceLanguageCode": "$actionInput.sourceLanguage",
                  "TargetLanguageCode": "$actionInput.targetLanguage",
                  "Text": $util.toJson($text)
                }},
                "headers": {{
                  "Content-Type": "application/x-amz-json-1.1",
                  "X-Amz-Target": "AWSShineFrontendService_20170701.TranslateText"
                }}
              }}
            }}
        "#, input = input(action)},
        PredictionsAction::ConvertTextToSpeech => formatdoc! {r#"
            #set( $actionInput = {input} )
            #set( $text = {text} )
            {{
              "version": "2018-05-29",
              "operation": "Invoke",
              "payload": {{
                "uuid": "$util.autoId()",
                "action": "convertTextToSpeech",
                "voiceID": "$actionInput.voiceID",
                "text": $util.toJson($text)
              }}
            }}
        "#, input = input(action)},
    }
}

pub(crate) fn response(action: PredictionsAction) -> String {
    let body = match action {
        PredictionsAction::IdentifyText => indoc! {r#"
            #set( $results = $util.parseJson($ctx.result.body) )
            #set( $text = "" )
            #foreach( $detection in $results.TextDetections )
              #if( $detection.Type == "LINE" )
                #if( $text.isEmpty() )
                  #set( $text = $detection.DetectedText )
                #else
                  #set( $text = "$text $detection.DetectedText" )
                #end
              #end
            #end
            $util.toJson($text)
        "#},
        PredictionsAction::IdentifyLabels => indoc! {r#"
            #set( $results = $util.parseJson($ctx.result.body) )
            #set( $labels = [] )
            #foreach( $label in $results.Labels )
              $util.qr($labels.add($label.Name))
            #end
            $util.toJson($labels)
        "#},
        PredictionsAction::TranslateText => indoc! {r"
            $util.toJson($util.parseJson($ctx.result.body).TranslatedText)
        "},
        PredictionsAction::ConvertTextToSpeech => indoc! {r"
            $util.toJson($ctx.result.url)
        "},
    };
    format!("{ERROR_CHECK}{body}")
}
