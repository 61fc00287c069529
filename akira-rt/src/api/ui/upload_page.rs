//! Upload page handler - drag-and-drop upload with live SSE progress

use axum::response::{Html, IntoResponse};

/// GET /upload
///
/// Drag-and-drop upload form. Progress is driven by the /events SSE
/// stream once the upload is accepted.
pub async fn upload_page() -> impl IntoResponse {
    Html(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AKIRA Retuner - Upload</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #1a1a1a;
            color: #e0e0e0;
            line-height: 1.6;
        }
        header {
            background-color: #2a2a2a;
            border-bottom: 1px solid #3a3a3a;
            padding: 20px;
            margin-bottom: 30px;
        }
        h1 {
            font-size: 26px;
            color: #4a9eff;
        }
        .content {
            padding: 0 40px;
            max-width: 860px;
        }
        .drop-zone {
            border: 2px dashed #4a9eff;
            border-radius: 8px;
            padding: 60px 20px;
            text-align: center;
            color: #888;
            cursor: pointer;
            transition: background 0.2s;
        }
        .drop-zone.dragover {
            background: #24344a;
            color: #e0e0e0;
        }
        .hidden {
            display: none;
        }
        #progress-section {
            margin-top: 30px;
        }
        .progress-bar {
            width: 100%;
            height: 22px;
            background: #2a2a2a;
            border-radius: 11px;
            overflow: hidden;
            margin: 10px 0;
        }
        .progress-fill {
            height: 100%;
            width: 0%;
            background: #4a9eff;
            transition: width 0.3s;
        }
        #state-label {
            font-family: 'Courier New', monospace;
            color: #4a9eff;
        }
        #operation {
            color: #888;
        }
        .error {
            color: #ef4444;
            margin-top: 10px;
        }
        .flagged-list {
            margin-top: 10px;
            font-size: 14px;
            color: #f59e0b;
        }
        .button {
            display: inline-block;
            padding: 10px 20px;
            background: #4a9eff;
            color: white;
            text-decoration: none;
            border-radius: 4px;
            margin-top: 15px;
            font-weight: 600;
        }
        .cancel {
            background: #ef4444;
            border: none;
            cursor: pointer;
            font-size: 15px;
        }
    </style>
</head>
<body>
    <header>
        <h1>Upload a cartoon video</h1>
    </header>
    <div class="content">
        <div class="drop-zone" id="drop-zone">
            <p>Drag an MP4 file here, or click to choose one</p>
            <input type="file" id="file-input" accept="video/mp4" class="hidden">
        </div>

        <div id="progress-section" class="hidden">
            <p><span id="state-label">UPLOADING</span> <span id="operation"></span></p>
            <div class="progress-bar"><div class="progress-fill" id="progress-fill"></div></div>
            <div class="flagged-list" id="flagged-list"></div>
            <button class="button cancel" id="cancel-button">Cancel</button>
        </div>

        <div id="done-section" class="hidden">
            <p>Retune complete.</p>
            <a class="button" id="output-link" href="#">Compare and download</a>
        </div>

        <p class="error hidden" id="error-message"></p>
    </div>

    <script>
        const dropZone = document.getElementById('drop-zone');
        const fileInput = document.getElementById('file-input');
        const progressSection = document.getElementById('progress-section');
        const doneSection = document.getElementById('done-section');
        const stateLabel = document.getElementById('state-label');
        const operation = document.getElementById('operation');
        const progressFill = document.getElementById('progress-fill');
        const flaggedList = document.getElementById('flagged-list');
        const errorMessage = document.getElementById('error-message');

        let sessionId = null;
        let eventSource = null;

        dropZone.addEventListener('click', () => fileInput.click());
        dropZone.addEventListener('dragover', (e) => {
            e.preventDefault();
            dropZone.classList.add('dragover');
        });
        dropZone.addEventListener('dragleave', () => dropZone.classList.remove('dragover'));
        dropZone.addEventListener('drop', (e) => {
            e.preventDefault();
            dropZone.classList.remove('dragover');
            if (e.dataTransfer.files.length > 0) {
                uploadFile(e.dataTransfer.files[0]);
            }
        });
        fileInput.addEventListener('change', () => {
            if (fileInput.files.length > 0) {
                uploadFile(fileInput.files[0]);
            }
        });

        document.getElementById('cancel-button').addEventListener('click', async () => {
            if (!sessionId) return;
            await fetch(`/jobs/${sessionId}/cancel`, { method: 'POST' });
        });

        function showError(message) {
            errorMessage.textContent = message;
            errorMessage.classList.remove('hidden');
        }

        function uploadFile(file) {
            errorMessage.classList.add('hidden');
            dropZone.classList.add('hidden');
            progressSection.classList.remove('hidden');

            connectEvents();

            const form = new FormData();
            form.append('video', file);

            const xhr = new XMLHttpRequest();
            xhr.open('POST', '/upload');
            xhr.upload.onprogress = (e) => {
                if (e.lengthComputable) {
                    const pct = (e.loaded / e.total) * 100;
                    progressFill.style.width = pct + '%';
                    operation.textContent = `Uploading ${file.name} (${pct.toFixed(0)}%)`;
                }
            };
            xhr.onload = () => {
                if (xhr.status === 202) {
                    const response = JSON.parse(xhr.responseText);
                    sessionId = response.session_id;
                    if (response.deduplicated) {
                        window.location.href = `/output/${sessionId}`;
                    }
                } else {
                    let message = `Upload failed (HTTP ${xhr.status})`;
                    try {
                        message = JSON.parse(xhr.responseText).error.message;
                    } catch (_) { /* keep fallback message */ }
                    showError(message);
                    progressSection.classList.add('hidden');
                    dropZone.classList.remove('hidden');
                }
            };
            xhr.onerror = () => showError('Upload failed: network error');
            xhr.send(form);
        }

        function connectEvents() {
            if (eventSource) return;
            eventSource = new EventSource('/events');

            eventSource.addEventListener('RetuneStateChanged', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                stateLabel.textContent = data.new_state;
            });

            eventSource.addEventListener('RetuneProgressUpdate', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                stateLabel.textContent = data.state;
                operation.textContent = data.operation;
                progressFill.style.width = data.percentage + '%';
            });

            eventSource.addEventListener('SegmentFlagged', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                const item = document.createElement('div');
                item.textContent =
                    `Segment ${data.segment_index}: ` +
                    `${data.start_seconds.toFixed(1)}s - ${data.end_seconds.toFixed(1)}s flagged`;
                flaggedList.appendChild(item);
            });

            eventSource.addEventListener('RetuneSessionCompleted', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                progressSection.classList.add('hidden');
                doneSection.classList.remove('hidden');
                document.getElementById('output-link').href = `/output/${sessionId}`;
                eventSource.close();
            });

            eventSource.addEventListener('RetuneSessionFailed', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                showError('Retune failed: ' + data.error);
                eventSource.close();
            });

            eventSource.addEventListener('RetuneSessionCancelled', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                showError('Retune cancelled');
                eventSource.close();
            });
        }
    </script>
</body>
</html>"##,
    )
}
