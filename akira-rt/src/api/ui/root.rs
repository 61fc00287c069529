//! Root page handler - product landing page

use axum::response::{Html, IntoResponse};

/// GET /
///
/// Landing page describing the retuner with a link to the upload page
pub async fn root_page() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AKIRA Retuner</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #1a1a1a;
            color: #e0e0e0;
            line-height: 1.6;
        }}
        header {{
            background-color: #2a2a2a;
            border-bottom: 1px solid #3a3a3a;
            padding: 20px;
            margin-bottom: 30px;
        }}
        .header-content {{
            display: flex;
            justify-content: space-between;
            align-items: center;
        }}
        h1 {{
            font-size: 26px;
            margin-bottom: 5px;
            color: #4a9eff;
        }}
        .subtitle {{
            color: #888;
            font-size: 16px;
        }}
        .version {{
            color: #888;
            font-family: 'Courier New', monospace;
            font-size: 14px;
        }}
        .content {{
            padding: 0 40px;
            max-width: 860px;
        }}
        h2 {{
            color: #4a9eff;
            margin-top: 20px;
            margin-bottom: 10px;
        }}
        ul {{
            margin-left: 20px;
            margin-bottom: 20px;
        }}
        .button {{
            display: inline-block;
            padding: 10px 20px;
            background: #4a9eff;
            color: white;
            text-decoration: none;
            border-radius: 4px;
            margin: 10px 5px;
            font-weight: 600;
        }}
        .button:hover {{
            background: #3a8eef;
        }}
    </style>
</head>
<body>
    <header>
        <div class="header-content">
            <div>
                <h1>AKIRA Retuner</h1>
                <p class="subtitle">Child-friendly audio retuning for cartoon videos</p>
            </div>
            <div class="version">akira-rt v{version}</div>
        </div>
    </header>
    <div class="content">
        <p>
            Upload a cartoon video and AKIRA finds the overstimulating parts of its
            soundtrack, softens them, and gives you back the same video with a calmer
            audio track.
        </p>

        <h2>How it works</h2>
        <ul>
            <li>The audio track is extracted and analyzed frame by frame</li>
            <li>Sudden loudness spikes and droning repetition are flagged</li>
            <li>Flagged segments are filtered, quieted, and smoothed</li>
            <li>The retuned audio is put back under the original video</li>
        </ul>

        <h2>Get started</h2>
        <p>
            <a href="/upload" class="button">Upload a video</a>
        </p>
    </div>
</body>
</html>"#
    ))
}
