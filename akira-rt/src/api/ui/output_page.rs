//! Output page handler - side-by-side comparison of source and retuned video

use axum::extract::Path;
use axum::response::{Html, IntoResponse};
use uuid::Uuid;

/// GET /output/:session_id
///
/// Plays the original and retuned videos side by side and renders the
/// per-segment report fetched from /jobs/:session_id/report.
pub async fn output_page(Path(session_id): Path<Uuid>) -> impl IntoResponse {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AKIRA Retuner - Result</title>
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
        h1 {{
            font-size: 26px;
            color: #4a9eff;
        }}
        h2 {{
            font-size: 18px;
            color: #e0e0e0;
            margin-bottom: 10px;
        }}
        .content {{
            padding: 0 40px 40px;
            max-width: 1200px;
        }}
        .players {{
            display: flex;
            gap: 20px;
            flex-wrap: wrap;
        }}
        .player {{
            flex: 1;
            min-width: 400px;
        }}
        video {{
            width: 100%;
            background: black;
            border-radius: 6px;
        }}
        .button {{
            display: inline-block;
            padding: 10px 20px;
            background: #4a9eff;
            color: white;
            text-decoration: none;
            border-radius: 4px;
            margin: 20px 10px 0 0;
            font-weight: 600;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
            margin-top: 20px;
            font-size: 14px;
        }}
        th, td {{
            text-align: left;
            padding: 8px 12px;
            border-bottom: 1px solid #3a3a3a;
        }}
        th {{
            color: #888;
            font-weight: 600;
        }}
        .flagged {{
            color: #f59e0b;
        }}
        #summary {{
            margin: 20px 0;
            color: #888;
        }}
        .error {{
            color: #ef4444;
        }}
    </style>
</head>
<body>
    <header>
        <h1>Retune result</h1>
    </header>
    <div class="content">
        <div class="players">
            <div class="player">
                <h2>Original</h2>
                <video controls src="/jobs/{session_id}/source"></video>
            </div>
            <div class="player">
                <h2>Retuned</h2>
                <video controls src="/jobs/{session_id}/output"></video>
            </div>
        </div>

        <a class="button" href="/jobs/{session_id}/output" download>Download retuned video</a>
        <a class="button" href="/upload">Retune another video</a>

        <p id="summary">Loading report...</p>
        <table id="report-table" style="display: none">
            <thead>
                <tr>
                    <th>Segment</th>
                    <th>Start</th>
                    <th>End</th>
                    <th>Coverage</th>
                    <th>Verdict</th>
                </tr>
            </thead>
            <tbody id="report-body"></tbody>
        </table>
    </div>

    <script>
        const summary = document.getElementById('summary');

        function formatTime(seconds) {{
            const m = Math.floor(seconds / 60);
            const s = (seconds % 60).toFixed(1).padStart(4, '0');
            return `${{m}}:${{s}}`;
        }}

        async function loadReport() {{
            let response;
            try {{
                response = await fetch('/jobs/{session_id}/report');
            }} catch (err) {{
                summary.innerHTML = '<span class="error">Failed to load report</span>';
                return;
            }}
            if (!response.ok) {{
                summary.innerHTML = '<span class="error">Report not available</span>';
                return;
            }}
            const report = await response.json();

            let text = `${{report.source_filename}}: ` +
                `${{report.flagged_count}} of ${{report.segments.length}} segments retuned`;
            if (report.repetition_detected) {{
                text += ' (repetitive audio detected)';
            }}
            summary.textContent = text;

            const body = document.getElementById('report-body');
            for (const segment of report.segments) {{
                const row = document.createElement('tr');
                if (segment.overstimulating) {{
                    row.classList.add('flagged');
                }}
                row.innerHTML =
                    `<td>${{segment.segment_index}}</td>` +
                    `<td>${{formatTime(segment.start_seconds)}}</td>` +
                    `<td>${{formatTime(segment.end_seconds)}}</td>` +
                    `<td>${{(segment.coverage * 100).toFixed(0)}}%</td>` +
                    `<td>${{segment.overstimulating ? 'Retuned' : 'Unchanged'}}</td>`;
                body.appendChild(row);
            }}
            document.getElementById('report-table').style.display = 'table';
        }}

        loadReport();
    </script>
</body>
</html>"#
    ))
}
